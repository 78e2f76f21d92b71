//! The structural outline generator (spec §4.G "Outline"): renders
//! the sampled run as a tree that mirrors source-level control flow
//! rather than the flat instruction-by-instruction trace the executor
//! produces.

use crate::executor::Executor;
use crate::state::ExecutionState;
use probsl_ir::{BlockId, Instruction, ProgramPosition};

/// One node of the outline tree. A `Branch` or `Loop` node's children
/// are themselves outlines of the arm or body, built by stepping the
/// same executor that produced the parent.
#[derive(Debug, Clone)]
pub enum Outline {
    Instruction(ExecutionState),
    Branch {
        state: ExecutionState,
        true_branch: Vec<Outline>,
        false_branch: Vec<Outline>,
    },
    Loop {
        state: ExecutionState,
        /// One entry per pass through the loop body that kept at least
        /// one live sample.
        iterations: Vec<Vec<Outline>>,
    },
}

/// Builds the outline for a whole run, from `state` to program end.
pub fn generate(executor: &mut Executor, state: ExecutionState) -> Vec<Outline> {
    build(executor, state, None).0
}

fn merge_position(executor: &Executor, block: BlockId) -> ProgramPosition {
    let prefix = executor
        .program()
        .block(block)
        .map(|b| b.phi_prefix_len())
        .unwrap_or(0);
    ProgramPosition::new(block, prefix)
}

/// Builds outline nodes from `state` until `stop_block` is reached,
/// every sample dies, or `Return` is hit. Returns the nodes plus the
/// state execution reached when it stopped, so a caller assembling a
/// branch's two arms can merge their tails back together.
fn build(
    executor: &mut Executor,
    state: ExecutionState,
    stop_block: Option<BlockId>,
) -> (Vec<Outline>, ExecutionState) {
    let mut out = Vec::new();
    let mut current = state;

    loop {
        if !current.has_samples() || Some(current.position.block) == stop_block {
            return (out, current);
        }

        let Some(instr) = executor.program().instruction_at(current.position).cloned() else {
            return (out, current);
        };

        match instr {
            Instruction::Return => {
                out.push(Outline::Instruction(current.clone()));
                return (out, current);
            }
            Instruction::Branch { .. } => {
                let block = current.position.block;
                let merge = executor.program().immediate_postdominator(block);
                let is_loop_header = executor.program().loops().iter().any(|l| l.header == block);

                if is_loop_header {
                    let (loop_node, remainder) = build_loop(executor, &current, block);
                    out.push(loop_node);
                    current = remainder;
                } else {
                    let (branch_node, tail) = build_branch(executor, &current, merge);
                    out.push(branch_node);
                    current = tail;
                }
            }
            _ => {
                out.push(Outline::Instruction(current.clone()));
                let mut next = executor.step(&current);
                current = next.pop().unwrap_or_else(|| current.emptied());
            }
        }
    }
}

fn build_branch(
    executor: &mut Executor,
    current: &ExecutionState,
    merge: Option<BlockId>,
) -> (Outline, ExecutionState) {
    let true_entry = executor.step_into_branch(current, true);
    let false_entry = executor.step_into_branch(current, false);

    let (true_nodes, true_tail) = match true_entry {
        Some(entry) => build(executor, entry, merge),
        None => (Vec::new(), empty_tail(executor, current, merge)),
    };
    let (false_nodes, false_tail) = match false_entry {
        Some(entry) => build(executor, entry, merge),
        None => (Vec::new(), empty_tail(executor, current, merge)),
    };

    let node = Outline::Branch {
        state: current.clone(),
        true_branch: true_nodes,
        false_branch: false_nodes,
    };

    let tail = match merge {
        Some(_) => ExecutionState::merged(&[true_tail, false_tail]).unwrap_or_else(|| current.emptied()),
        None => current.emptied(),
    };

    (node, tail)
}

fn build_loop(
    executor: &mut Executor,
    header: &ExecutionState,
    header_block: BlockId,
) -> (Outline, ExecutionState) {
    let mut iterations = Vec::new();
    let mut at_header = header.clone();

    loop {
        match executor.step_into_branch(&at_header, true) {
            Some(entry) if entry.has_samples() => {
                let (body_nodes, tail) = build(executor, entry, Some(header_block));
                iterations.push(body_nodes);
                at_header = tail;
            }
            _ => break,
        }
    }

    let exit = executor
        .step_into_branch(&at_header, false)
        .unwrap_or_else(|| at_header.emptied());

    (
        Outline::Loop {
            state: header.clone(),
            iterations,
        },
        exit,
    )
}

fn empty_tail(executor: &Executor, current: &ExecutionState, merge: Option<BlockId>) -> ExecutionState {
    match merge {
        Some(block) => ExecutionState::new(merge_position(executor, block), Vec::new()),
        None => current.emptied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RunLimits;
    use probsl_ir::{BasicBlock, DebugInfo, IrProgram, IrType, IrVariable, VarId, Vol};
    use std::rc::Rc;

    fn var(id: u32, ty: IrType) -> IrVariable {
        IrVariable::new(VarId::new(id), ty)
    }

    fn if_else_program() -> IrProgram {
        let c = var(0, IrType::Bool);
        let x = var(1, IrType::Int);
        let y = var(2, IrType::Int);
        let bb0 = BasicBlock::new(
            BlockId::new(0),
            vec![
                Instruction::Assign {
                    dest: c,
                    value: Vol::BoolLiteral(true),
                },
                Instruction::Branch {
                    cond: Vol::Variable(c),
                    true_target: BlockId::new(1),
                    false_target: BlockId::new(2),
                },
            ],
        );
        let bb1 = BasicBlock::new(
            BlockId::new(1),
            vec![
                Instruction::Assign {
                    dest: x,
                    value: Vol::IntLiteral(10),
                },
                Instruction::Jump {
                    target: BlockId::new(3),
                },
            ],
        );
        let bb2 = BasicBlock::new(
            BlockId::new(2),
            vec![
                Instruction::Assign {
                    dest: x,
                    value: Vol::IntLiteral(20),
                },
                Instruction::Jump {
                    target: BlockId::new(3),
                },
            ],
        );
        let bb3 = BasicBlock::new(
            BlockId::new(3),
            vec![
                Instruction::Phi {
                    dest: y,
                    choices: vec![(BlockId::new(1), x.id), (BlockId::new(2), x.id)],
                },
                Instruction::Return,
            ],
        );
        IrProgram::new(vec![bb0, bb1, bb2, bb3], BlockId::new(0), DebugInfo::new()).unwrap()
    }

    #[test]
    fn outline_of_a_one_sided_branch_has_no_false_nodes() {
        let program = Rc::new(if_else_program());
        let mut executor = Executor::new(program.clone(), 0, RunLimits::default());
        let start = ProgramPosition::new(program.start_block(), 0);
        let state = ExecutionState::initial(start, 4);
        let nodes = generate(&mut executor, state);

        let branch = nodes
            .iter()
            .find_map(|n| match n {
                Outline::Branch {
                    true_branch,
                    false_branch,
                    ..
                } => Some((true_branch, false_branch)),
                _ => None,
            })
            .expect("outline has a branch node");
        assert!(!branch.0.is_empty());
        assert!(branch.1.is_empty());
    }
}
