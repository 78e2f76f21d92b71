//! The IR verifier (spec §3, §4.A): checks run once at `IrProgram`
//! construction. Every violation here indicates an IRGen defect, not a
//! user mistake (spec §7 `ProgramBug`) — callers that trust their own
//! lowering pass use [`crate::IrProgram::new_trusted`], which turns a
//! verification failure into a process abort via
//! `probsl_diagnostics::program_bug`. Tests exercise
//! [`crate::IrProgram::new`] directly to assert both success and
//! failure (spec §8 property 1).

use crate::blocks::BasicBlock;
use crate::instructions::{BlockId, Instruction};
use crate::types::VarId;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single verifier violation, reported with the offending block and,
/// where applicable, instruction index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    MissingStartBlock { start: BlockId },
    UnknownJumpTarget { block: BlockId, target: BlockId },
    UnreachablePredecessorless { block: BlockId },
    NotExactlyOneReturn { count: usize },
    TerminatorNotLast { block: BlockId, index: usize },
    PhiNotInPrefix { block: BlockId, index: usize },
    PhiChoicesMismatchPredecessors {
        block: BlockId,
        expected: Vec<BlockId>,
        found: Vec<BlockId>,
    },
    UseNotDominated { block: BlockId, index: usize, variable: VarId },
    EmptyBlock { block: BlockId },
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStartBlock { start } => write!(f, "start block {start} does not exist"),
            Self::UnknownJumpTarget { block, target } => {
                write!(f, "block {block} jumps to non-existent block {target}")
            }
            Self::UnreachablePredecessorless { block } => {
                write!(f, "non-start block {block} has no predecessors")
            }
            Self::NotExactlyOneReturn { count } => {
                write!(f, "expected exactly one `return` block, found {count}")
            }
            Self::TerminatorNotLast { block, index } => write!(
                f,
                "block {block} instruction {index} is a terminator but is not last"
            ),
            Self::PhiNotInPrefix { block, index } => write!(
                f,
                "block {block} instruction {index} is a `phi` outside the leading phi prefix"
            ),
            Self::PhiChoicesMismatchPredecessors {
                block,
                expected,
                found,
            } => write!(
                f,
                "block {block}'s phi choices {found:?} do not match its predecessors {expected:?}"
            ),
            Self::UseNotDominated {
                block,
                index,
                variable,
            } => write!(
                f,
                "block {block} instruction {index} uses {variable} which is not defined in a predominator or earlier in the same block"
            ),
            Self::EmptyBlock { block } => write!(f, "block {block} has no instructions"),
        }
    }
}

impl std::error::Error for VerifierError {}

/// Scans terminators to build the direct-predecessor map.
pub(crate) fn direct_predecessors(
    blocks: &HashMap<BlockId, BasicBlock>,
) -> HashMap<BlockId, Vec<BlockId>> {
    let mut preds: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
    let mut order: Vec<BlockId> = blocks.keys().copied().collect();
    order.sort_by_key(|id| id.0);

    for &id in &order {
        for succ in blocks[&id].successors() {
            preds.entry(succ).or_default().push(id);
        }
    }
    preds
}

pub fn verify(
    blocks: &HashMap<BlockId, BasicBlock>,
    start: BlockId,
) -> Result<(), Vec<VerifierError>> {
    let mut errors = Vec::new();

    // 1. start block exists.
    if !blocks.contains_key(&start) {
        errors.push(VerifierError::MissingStartBlock { start });
        return Err(errors);
    }

    let mut block_ids: Vec<BlockId> = blocks.keys().copied().collect();
    block_ids.sort_by_key(|id| id.0);

    // Non-terminator-is-terminator-kind and nonempty checks, plus phi prefix.
    for &id in &block_ids {
        let block = &blocks[&id];
        if block.instructions.is_empty() {
            errors.push(VerifierError::EmptyBlock { block: id });
            continue;
        }

        let last = block.instructions.len() - 1;
        for (i, inst) in block.instructions.iter().enumerate() {
            if inst.is_terminator() && i != last {
                errors.push(VerifierError::TerminatorNotLast { block: id, index: i });
            }
            if !inst.is_terminator() && i == last {
                // last instruction must itself be a terminator (Jump/Branch/Return);
                // a non-terminator in final position is also a terminator-kind
                // violation in spirit, captured by the same invariant.
                errors.push(VerifierError::TerminatorNotLast { block: id, index: i });
            }
        }

        let phi_prefix = block.phi_prefix_len();
        for (i, inst) in block.instructions.iter().enumerate() {
            if inst.is_phi() && i >= phi_prefix {
                errors.push(VerifierError::PhiNotInPrefix { block: id, index: i });
            }
        }
    }

    // 2. every jump/branch target exists.
    for &id in &block_ids {
        for target in blocks[&id].successors() {
            if !blocks.contains_key(&target) {
                errors.push(VerifierError::UnknownJumpTarget { block: id, target });
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let preds = direct_predecessors(blocks);

    // 3. every non-start block has >= 1 predecessor.
    for &id in &block_ids {
        if id != start && preds.get(&id).map(|p| p.len()).unwrap_or(0) == 0 {
            errors.push(VerifierError::UnreachablePredecessorless { block: id });
        }
    }

    // 4. exactly one block ends with Return.
    let return_count = block_ids
        .iter()
        .filter(|id| matches!(blocks[id].terminator(), Instruction::Return))
        .count();
    if return_count != 1 {
        errors.push(VerifierError::NotExactlyOneReturn { count: return_count });
    }

    // 6. every phi's choices keys equal the set of direct predecessors.
    for &id in &block_ids {
        let block = &blocks[&id];
        let mut expected: Vec<BlockId> = preds.get(&id).cloned().unwrap_or_default();
        expected.sort_by_key(|b| b.0);
        let mut expected_set: HashSet<BlockId> = expected.iter().copied().collect();

        for inst in block.phis() {
            if let Instruction::Phi { choices, .. } = inst {
                let mut found: Vec<BlockId> = choices.iter().map(|(b, _)| *b).collect();
                found.sort_by_key(|b| b.0);
                let found_set: HashSet<BlockId> = found.iter().copied().collect();
                if found_set != expected_set {
                    errors.push(VerifierError::PhiChoicesMismatchPredecessors {
                        block: id,
                        expected: expected.clone(),
                        found,
                    });
                }
            }
        }
        expected_set.clear();
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // 7. every used variable is defined in a predominator or earlier in
    // the same block (ignoring a phi's own predecessor-keyed uses).
    let predominators = crate::analyses::predominators_raw(blocks, &preds, start);
    let mut defined_at: HashMap<VarId, BlockId> = HashMap::new();
    for &id in &block_ids {
        for inst in &blocks[&id].instructions {
            if let Some(var) = inst.dest() {
                defined_at.insert(var.id, id);
            }
        }
    }

    for &id in &block_ids {
        let block = &blocks[&id];
        let mut defined_so_far: HashSet<VarId> = HashSet::new();
        for (index, inst) in block.instructions.iter().enumerate() {
            if !inst.is_phi() {
                for used in inst.uses() {
                    // A same-block definition only counts via
                    // `defined_so_far` (which only holds variables
                    // defined *earlier* in this block): every block
                    // predominates itself, so consulting
                    // `predominators` here would let a use before its
                    // definition in the same block pass trivially.
                    let ok = defined_so_far.contains(&used.id)
                        || defined_at
                            .get(&used.id)
                            .map(|def_block| {
                                *def_block != id
                                    && predominators
                                        .get(&id)
                                        .map(|doms| doms.contains(def_block))
                                        .unwrap_or(false)
                            })
                            .unwrap_or(false);
                    if !ok {
                        errors.push(VerifierError::UseNotDominated {
                            block: id,
                            index,
                            variable: used.id,
                        });
                    }
                }
            }
            if let Some(dest) = inst.dest() {
                defined_so_far.insert(dest.id);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
