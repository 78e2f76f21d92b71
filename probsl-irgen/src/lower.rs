//! AST -> IR lowering (spec §4.E, §6): a direct recursive-descent walk
//! that builds basic blocks as it goes and inserts phi nodes at every
//! branch merge point and loop header, re-keying loop-carried
//! variables the way spec §6 requires ("IRGen [must] re-key variables
//! after phi-merges inside loops").

use crate::builder::Builder;
use probsl_diagnostics::IrGenError;
use probsl_ir::{CompareOp, Instruction, InstructionClass, IrType, IrVariable, Vol};
use probsl_parser::{BinOp, Block, Expr, ExprKind, Program, Span, Stmt, StmtKind, TypeName};
use std::collections::HashMap;

fn to_ir_type(ty: TypeName) -> IrType {
    match ty {
        TypeName::Int => IrType::Int,
        TypeName::Bool => IrType::Bool,
    }
}

pub fn lower_program(builder: &mut Builder, program: &Program) -> Result<(), IrGenError> {
    for stmt in &program.statements {
        lower_stmt(builder, stmt)?;
    }
    builder.emit(Instruction::Return);
    builder.record_return_debug();
    Ok(())
}

fn lower_stmt(builder: &mut Builder, stmt: &Stmt) -> Result<(), IrGenError> {
    match &stmt.kind {
        StmtKind::VarDecl { ty, name, value } => {
            let declared_ty = to_ir_type(*ty);
            let value_ir = lower_expr(builder, value)?;
            if value_ir.ty() != declared_ty {
                return Err(type_mismatch(
                    builder,
                    format!(
                        "cannot initialize `{name}` of type {declared_ty} with a value of type {}",
                        value_ir.ty()
                    ),
                    stmt.span,
                ));
            }

            let var = builder.fresh_var(declared_ty);
            builder.emit(Instruction::Assign { dest: var, value: value_ir });
            builder
                .env
                .declare(name, var)
                .map_err(|()| duplicate_declaration(builder, name.clone(), stmt.span))?;
            builder.record_debug(stmt.span, InstructionClass::Simple);
            Ok(())
        }

        StmtKind::Assign { name, value } => {
            let existing = builder
                .env
                .get(name)
                .ok_or_else(|| use_before_declaration(builder, name.clone(), stmt.span))?;
            let value_ir = lower_expr(builder, value)?;
            if value_ir.ty() != existing.ty {
                return Err(type_mismatch(
                    builder,
                    format!(
                        "cannot assign a value of type {} to `{name}` of type {}",
                        value_ir.ty(),
                        existing.ty
                    ),
                    stmt.span,
                ));
            }

            let var = builder.fresh_var(existing.ty);
            builder.emit(Instruction::Assign { dest: var, value: value_ir });
            builder.env.assign(name, var);
            builder.record_debug(stmt.span, InstructionClass::Simple);
            Ok(())
        }

        StmtKind::Observe { cond } => {
            let cond_ir = lower_expr(builder, cond)?;
            if cond_ir.ty() != IrType::Bool {
                return Err(type_mismatch(builder, "`observe` condition must be bool".to_string(), stmt.span));
            }
            builder.emit(Instruction::Observe { cond: cond_ir });
            builder.record_debug(stmt.span, InstructionClass::Simple);
            Ok(())
        }

        StmtKind::Block(inner) => lower_block_in_new_scope(builder, inner),

        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => lower_if(builder, stmt.span, cond, then_branch, else_branch.as_ref()),

        StmtKind::While { cond, body } => lower_while(builder, stmt.span, cond, body),
    }
}

fn lower_block_in_new_scope(builder: &mut Builder, block: &Block) -> Result<(), IrGenError> {
    builder.env.push_scope();
    for stmt in block {
        if let Err(e) = lower_stmt(builder, stmt) {
            builder.env.pop_scope();
            return Err(e);
        }
    }
    builder.env.pop_scope();
    Ok(())
}

fn lower_if(
    builder: &mut Builder,
    span: Span,
    cond: &Expr,
    then_branch: &Block,
    else_branch: Option<&Block>,
) -> Result<(), IrGenError> {
    let cond_ir = lower_expr(builder, cond)?;
    if cond_ir.ty() != IrType::Bool {
        return Err(type_mismatch(builder, "`if` condition must be bool".to_string(), span));
    }

    let branch_block = builder.current_block();
    let then_block = builder.fresh_block();
    let else_block = else_branch.map(|_| builder.fresh_block());
    let merge_block = builder.fresh_block();
    let false_target = else_block.unwrap_or(merge_block);

    builder.emit(Instruction::Branch {
        cond: cond_ir,
        true_target: then_block,
        false_target,
    });
    builder.record_debug(span, InstructionClass::IfElseBranch);

    let pre_snapshot = builder.env.snapshot();

    builder.set_current(then_block);
    lower_block_in_new_scope(builder, then_branch)?;
    let then_tail = builder.current_block();
    builder.emit(Instruction::Jump { target: merge_block });
    let then_exit = builder.env.snapshot();

    builder.env.restore(pre_snapshot.clone());

    let (else_tail, else_exit) = match else_branch {
        Some(else_stmts) => {
            builder.set_current(else_block.expect("else_block created above"));
            lower_block_in_new_scope(builder, else_stmts)?;
            let tail = builder.current_block();
            builder.emit(Instruction::Jump { target: merge_block });
            (tail, builder.env.snapshot())
        }
        None => (branch_block, pre_snapshot.clone()),
    };

    builder.set_current(merge_block);
    builder.env.restore(pre_snapshot);
    merge_envs(builder, then_exit, then_tail, else_exit, else_tail);

    Ok(())
}

/// Merges two post-branch environments at a fresh block, inserting a
/// phi for every name whose binding differs between the two sides.
fn merge_envs(
    builder: &mut Builder,
    then_exit: HashMap<String, (IrVariable, String)>,
    then_block: probsl_ir::BlockId,
    else_exit: HashMap<String, (IrVariable, String)>,
    else_block: probsl_ir::BlockId,
) {
    let mut names: Vec<&String> = then_exit.keys().collect();
    names.sort();

    let mut merged = HashMap::new();
    for name in names {
        let (t_var, display_key) = &then_exit[name];
        let (e_var, _) = &else_exit[name];

        if t_var.id == e_var.id {
            merged.insert(name.clone(), (*t_var, display_key.clone()));
        } else {
            let phi_var = builder.fresh_var(t_var.ty);
            let mut choices = vec![(then_block, t_var.id), (else_block, e_var.id)];
            choices.sort_by_key(|(b, _)| b.0);
            builder.emit(Instruction::Phi {
                dest: phi_var,
                choices,
            });
            merged.insert(name.clone(), (phi_var, display_key.clone()));
        }
    }
    builder.env.restore(merged);
}

fn lower_while(builder: &mut Builder, span: Span, cond: &Expr, body: &Block) -> Result<(), IrGenError> {
    let pre_block = builder.current_block();
    let header = builder.fresh_block();
    builder.emit(Instruction::Jump { target: header });
    builder.set_current(header);

    let pre_snapshot = builder.env.snapshot();
    let mut names: Vec<&String> = pre_snapshot.keys().collect();
    names.sort();

    let mut phi_patches = Vec::new();
    let mut header_bindings = HashMap::new();
    for name in names {
        let (var, display_key) = &pre_snapshot[name];
        let phi_var = builder.fresh_var(var.ty);
        let index = builder.emit(Instruction::Phi {
            dest: phi_var,
            choices: vec![(pre_block, var.id)],
        });
        phi_patches.push((name.clone(), index));
        header_bindings.insert(name.clone(), (phi_var, display_key.clone()));
    }
    builder.env.restore(header_bindings.clone());

    let cond_ir = lower_expr(builder, cond)?;
    if cond_ir.ty() != IrType::Bool {
        return Err(type_mismatch(builder, "`while` condition must be bool".to_string(), span));
    }

    let body_block = builder.fresh_block();
    let exit_block = builder.fresh_block();
    builder.emit(Instruction::Branch {
        cond: cond_ir,
        true_target: body_block,
        false_target: exit_block,
    });
    builder.record_debug(span, InstructionClass::LoopBranch);

    builder.set_current(body_block);
    lower_block_in_new_scope(builder, body)?;
    let body_tail = builder.current_block();
    builder.emit(Instruction::Jump { target: header });

    for (name, index) in &phi_patches {
        if let Some(var) = builder.env.get(name) {
            builder.patch_phi(header, *index, (body_tail, var.id));
        }
    }

    builder.env.restore(header_bindings);
    builder.set_current(exit_block);

    Ok(())
}

fn lower_expr(builder: &mut Builder, expr: &Expr) -> Result<Vol, IrGenError> {
    match &expr.kind {
        ExprKind::IntLiteral(v) => Ok(Vol::IntLiteral(*v)),
        ExprKind::BoolLiteral(v) => Ok(Vol::BoolLiteral(*v)),

        ExprKind::Identifier(name) => builder
            .env
            .get(name)
            .map(Vol::Variable)
            .ok_or_else(|| use_before_declaration(builder, name.clone(), expr.span)),

        ExprKind::Binary { op, lhs, rhs } => {
            let lhs_ir = lower_expr(builder, lhs)?;
            let rhs_ir = lower_expr(builder, rhs)?;

            match op {
                BinOp::Add | BinOp::Sub => {
                    if lhs_ir.ty() != IrType::Int || rhs_ir.ty() != IrType::Int {
                        return Err(type_mismatch(
                            builder,
                            "arithmetic operands must be int".to_string(),
                            expr.span,
                        ));
                    }
                    let dest = builder.fresh_var(IrType::Int);
                    let instr = match op {
                        BinOp::Add => Instruction::Add { dest, lhs: lhs_ir, rhs: rhs_ir },
                        BinOp::Sub => Instruction::Sub { dest, lhs: lhs_ir, rhs: rhs_ir },
                        _ => unreachable!(),
                    };
                    builder.emit(instr);
                    Ok(Vol::Variable(dest))
                }

                BinOp::Eq | BinOp::Lt => {
                    if lhs_ir.ty() != IrType::Int || rhs_ir.ty() != IrType::Int {
                        return Err(type_mismatch(
                            builder,
                            "comparison operands must be int".to_string(),
                            expr.span,
                        ));
                    }
                    let dest = builder.fresh_var(IrType::Bool);
                    let cmp_op = match op {
                        BinOp::Eq => CompareOp::Eq,
                        BinOp::Lt => CompareOp::Lt,
                        _ => unreachable!(),
                    };
                    builder.emit(Instruction::Compare {
                        op: cmp_op,
                        dest,
                        lhs: lhs_ir,
                        rhs: rhs_ir,
                    });
                    Ok(Vol::Variable(dest))
                }
            }
        }

        ExprKind::Discrete(entries) => {
            let sum: f64 = entries.iter().map(|(_, p)| p).sum();
            if (sum - 1.0).abs() > 1e-9 {
                return Err(IrGenError::DiscreteProbabilitiesNotSummingToOne {
                    sum,
                    span: builder.span(expr.span),
                });
            }
            let dest = builder.fresh_var(IrType::Int);
            builder.emit(Instruction::DiscreteDistribution {
                dest,
                table: entries.clone(),
            });
            Ok(Vol::Variable(dest))
        }
    }
}

fn type_mismatch(builder: &Builder, message: String, span: Span) -> IrGenError {
    IrGenError::TypeMismatch { message, span: builder.span(span) }
}

fn use_before_declaration(builder: &Builder, name: String, span: Span) -> IrGenError {
    IrGenError::UseBeforeDeclaration { name, span: builder.span(span) }
}

fn duplicate_declaration(builder: &Builder, name: String, span: Span) -> IrGenError {
    IrGenError::DuplicateDeclaration { name, span: builder.span(span) }
}
