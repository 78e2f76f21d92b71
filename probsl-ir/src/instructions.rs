//! IR instructions (spec §3 "Instruction").

use crate::types::{IrType, IrVariable, VarId, Vol};
use std::fmt;

/// Identifies a basic block, unique within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Comparison operators SL exposes (spec §3 restricts this to `eq`/`lt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "eq"),
            Self::Lt => write!(f, "lt"),
        }
    }
}

/// An IR instruction (spec §3).
///
/// `DiscreteDistribution`'s table is a `Vec` rather than a hash map so
/// that cumulative-probability computation (spec §4.C) and the textual
/// dump are deterministic regardless of hashing; IRGen is responsible
/// for producing the table in whatever order the source listed it.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Assign {
        dest: IrVariable,
        value: Vol,
    },
    Add {
        dest: IrVariable,
        lhs: Vol,
        rhs: Vol,
    },
    Sub {
        dest: IrVariable,
        lhs: Vol,
        rhs: Vol,
    },
    Compare {
        op: CompareOp,
        dest: IrVariable,
        lhs: Vol,
        rhs: Vol,
    },
    DiscreteDistribution {
        dest: IrVariable,
        table: Vec<(i64, f64)>,
    },
    Observe {
        cond: Vol,
    },
    Jump {
        target: BlockId,
    },
    Branch {
        cond: Vol,
        true_target: BlockId,
        false_target: BlockId,
    },
    Phi {
        dest: IrVariable,
        choices: Vec<(BlockId, VarId)>,
    },
    Return,
}

impl Instruction {
    /// The variable this instruction binds, if any.
    pub fn dest(&self) -> Option<IrVariable> {
        match self {
            Self::Assign { dest, .. }
            | Self::Add { dest, .. }
            | Self::Sub { dest, .. }
            | Self::Compare { dest, .. }
            | Self::DiscreteDistribution { dest, .. }
            | Self::Phi { dest, .. } => Some(*dest),
            Self::Observe { .. }
            | Self::Jump { .. }
            | Self::Branch { .. }
            | Self::Return => None,
        }
    }

    /// Variables read by this instruction, not counting a `Phi`'s
    /// predecessor-keyed incoming values (spec §3 invariant 7 excludes
    /// those from the ordinary dominance-based use check).
    pub fn uses(&self) -> Vec<IrVariable> {
        match self {
            Self::Assign { value, .. } => value.variable().into_iter().collect(),
            Self::Add { lhs, rhs, .. } | Self::Sub { lhs, rhs, .. } => {
                [lhs.variable(), rhs.variable()].into_iter().flatten().collect()
            }
            Self::Compare { lhs, rhs, .. } => {
                [lhs.variable(), rhs.variable()].into_iter().flatten().collect()
            }
            Self::Observe { cond } => cond.variable().into_iter().collect(),
            Self::Branch { cond, .. } => cond.variable().into_iter().collect(),
            Self::DiscreteDistribution { .. }
            | Self::Jump { .. }
            | Self::Phi { .. }
            | Self::Return => Vec::new(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Self::Jump { .. } | Self::Branch { .. } | Self::Return)
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Self::Phi { .. })
    }

    /// Direct successor blocks a terminator can transfer control to.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Jump { target } => vec![*target],
            Self::Branch {
                true_target,
                false_target,
                ..
            } => vec![*true_target, *false_target],
            _ => Vec::new(),
        }
    }
}

fn type_name(ty: IrType) -> &'static str {
    match ty {
        IrType::Int => "int",
        IrType::Bool => "bool",
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { dest, value } => {
                write!(f, "{} = {} {}", dest.id, type_name(dest.ty), value)
            }
            Self::Add { dest, lhs, rhs } => {
                write!(f, "{} = add int {} int {}", dest.id, lhs, rhs)
            }
            Self::Sub { dest, lhs, rhs } => {
                write!(f, "{} = sub int {} int {}", dest.id, lhs, rhs)
            }
            Self::Compare { op, dest, lhs, rhs } => {
                write!(f, "{} = cmp {} int {} int {}", dest.id, op, lhs, rhs)
            }
            Self::DiscreteDistribution { dest, table } => {
                let entries: Vec<String> = table.iter().map(|(k, p)| format!("{k}: {p}")).collect();
                write!(f, "{} = discrete int {{{}}}", dest.id, entries.join(", "))
            }
            Self::Observe { cond } => write!(f, "observe bool {cond}"),
            Self::Jump { target } => write!(f, "jump {target}"),
            Self::Branch {
                cond,
                true_target,
                false_target,
            } => write!(f, "br bool {cond} {true_target} {false_target}"),
            Self::Phi { dest, choices } => {
                let entries: Vec<String> =
                    choices.iter().map(|(b, v)| format!("{b}: {v}")).collect();
                write!(f, "{} = phi {}", dest.id, entries.join(", "))
            }
            Self::Return => write!(f, "return"),
        }
    }
}
