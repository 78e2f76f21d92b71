//! Basic blocks (spec §3 "Basic Block").

use crate::instructions::{BlockId, Instruction};

/// An ordered, nonempty sequence of instructions ending in a
/// terminator. All `Phi` instructions form a contiguous prefix.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(id: BlockId, instructions: Vec<Instruction>) -> Self {
        Self { id, instructions }
    }

    pub fn terminator(&self) -> &Instruction {
        self.instructions
            .last()
            .expect("basic block invariant: nonempty, enforced at construction")
    }

    pub fn phi_prefix_len(&self) -> usize {
        self.instructions
            .iter()
            .take_while(|inst| inst.is_phi())
            .count()
    }

    pub fn phis(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions[..self.phi_prefix_len()].iter()
    }

    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator().successors()
    }
}
