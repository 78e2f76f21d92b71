//! Per-sample execution semantics (spec §4.C "Sample semantics").

use probsl_diagnostics::program_bug;
use probsl_ir::{Instruction, IrValue, VarId, Vol};
use rand::Rng;
use std::collections::HashMap;

/// One concrete run through the program: a binding from every IR
/// variable defined so far to its value.
pub type Sample = HashMap<VarId, IrValue>;

/// Reads a variable-or-literal against a sample. A missing variable is
/// a program bug (spec §4.A invariant 7 guarantees every use is
/// dominated by a definition, so a verified program never reads an
/// unbound variable at runtime).
pub fn eval(sample: &Sample, vol: &Vol) -> IrValue {
    match vol {
        Vol::IntLiteral(v) => IrValue::Int(*v),
        Vol::BoolLiteral(v) => IrValue::Bool(*v),
        Vol::Variable(var) => *sample
            .get(&var.id)
            .unwrap_or_else(|| program_bug(format!("read of unbound variable {}", var.id))),
    }
}

/// Draws from a discrete table by comparing one uniform-[0,1) draw
/// against cumulative probability; the last entry catches any residue
/// from floating point error, so the draw always lands somewhere.
fn draw_discrete(table: &[(i64, f64)], rng: &mut impl Rng) -> i64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    let mut cumulative = 0.0;
    for (i, (value, p)) in table.iter().enumerate() {
        cumulative += p;
        if u < cumulative || i == table.len() - 1 {
            return *value;
        }
    }
    program_bug("discrete distribution table was empty")
}

/// Advances one sample across one non-control-flow instruction (spec
/// §4.C). `Jump`, `Branch`, `Phi`, and `Return` are handled by the
/// executor's block-level dispatch and never reach here; hitting one
/// is a program bug.
///
/// Returns `None` when an `Observe` instruction rejects the sample;
/// every other instruction always returns `Some`.
pub fn step_sample(sample: &Sample, instr: &Instruction, rng: &mut impl Rng) -> Option<Sample> {
    match instr {
        Instruction::Assign { dest, value } => {
            let mut next = sample.clone();
            next.insert(dest.id, eval(sample, value));
            Some(next)
        }
        Instruction::Add { dest, lhs, rhs } => {
            let a = eval(sample, lhs).as_int().unwrap_or_else(|| {
                program_bug(format!("add operand {lhs} is not an int"))
            });
            let b = eval(sample, rhs).as_int().unwrap_or_else(|| {
                program_bug(format!("add operand {rhs} is not an int"))
            });
            let mut next = sample.clone();
            next.insert(dest.id, IrValue::Int(a + b));
            Some(next)
        }
        Instruction::Sub { dest, lhs, rhs } => {
            let a = eval(sample, lhs).as_int().unwrap_or_else(|| {
                program_bug(format!("sub operand {lhs} is not an int"))
            });
            let b = eval(sample, rhs).as_int().unwrap_or_else(|| {
                program_bug(format!("sub operand {rhs} is not an int"))
            });
            let mut next = sample.clone();
            next.insert(dest.id, IrValue::Int(a - b));
            Some(next)
        }
        Instruction::Compare { op, dest, lhs, rhs } => {
            let a = eval(sample, lhs).as_int().unwrap_or_else(|| {
                program_bug(format!("compare operand {lhs} is not an int"))
            });
            let b = eval(sample, rhs).as_int().unwrap_or_else(|| {
                program_bug(format!("compare operand {rhs} is not an int"))
            });
            let result = match op {
                probsl_ir::CompareOp::Eq => a == b,
                probsl_ir::CompareOp::Lt => a < b,
            };
            let mut next = sample.clone();
            next.insert(dest.id, IrValue::Bool(result));
            Some(next)
        }
        Instruction::DiscreteDistribution { dest, table } => {
            let mut next = sample.clone();
            next.insert(dest.id, IrValue::Int(draw_discrete(table, rng)));
            Some(next)
        }
        Instruction::Observe { cond } => {
            let value = eval(sample, cond).as_bool().unwrap_or_else(|| {
                program_bug(format!("observe condition {cond} is not a bool"))
            });
            if value {
                Some(sample.clone())
            } else {
                None
            }
        }
        Instruction::Jump { .. }
        | Instruction::Branch { .. }
        | Instruction::Phi { .. }
        | Instruction::Return => {
            program_bug(format!("step_sample called on control-flow instruction {instr}"))
        }
    }
}
