//! Pure static analyses over the block graph (spec §4.B).
//!
//! Every function here is a pure function of an already-verified
//! [`crate::IrProgram`] (or, for `predominators_raw`, of the raw block
//! map used while the verifier is still running). Results are safe to
//! cache for the lifetime of a program since IR programs are
//! immutable once constructed; [`crate::AnalysisCache`] does that
//! caching for callers that want it.

use crate::blocks::BasicBlock;
use crate::instructions::BlockId;
use crate::verify::direct_predecessors;
use std::collections::{HashMap, HashSet};

/// Direct predecessors of every block, by scanning terminators.
pub fn predecessors(blocks: &HashMap<BlockId, BasicBlock>) -> HashMap<BlockId, Vec<BlockId>> {
    direct_predecessors(blocks)
}

/// Direct successors of every block.
pub fn successors(blocks: &HashMap<BlockId, BasicBlock>) -> HashMap<BlockId, Vec<BlockId>> {
    blocks
        .iter()
        .map(|(&id, block)| (id, block.successors()))
        .collect()
}

/// The reflexive-transitive closure of "is a predecessor of", computed
/// by DFS over the reversed edge set.
pub fn transitive_predecessors(
    blocks: &HashMap<BlockId, BasicBlock>,
    of: BlockId,
) -> HashSet<BlockId> {
    let preds = predecessors(blocks);
    let mut seen = HashSet::new();
    let mut stack = vec![of];
    while let Some(b) = stack.pop() {
        if seen.insert(b) {
            if let Some(ps) = preds.get(&b) {
                stack.extend(ps.iter().copied());
            }
        }
    }
    seen
}

/// Classical fixed-point predominator computation (spec §4.B):
/// `pred(start) = {start}`, `pred(B) = {B} ∪ ⋂ pred(P)` over direct
/// predecessors `P` of `B`, iterated to a fixed point. The lattice of
/// block sets ordered by ⊇ has finite height and the transfer function
/// is monotone, so this always terminates.
///
/// Exposed so the verifier can compute predominators on a block map
/// that hasn't been wrapped in an `IrProgram` yet (invariant 7 needs
/// them before the program is considered valid).
pub fn predominators_raw(
    blocks: &HashMap<BlockId, BasicBlock>,
    preds: &HashMap<BlockId, Vec<BlockId>>,
    start: BlockId,
) -> HashMap<BlockId, HashSet<BlockId>> {
    let all: HashSet<BlockId> = blocks.keys().copied().collect();
    let mut dom: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();

    for &id in blocks.keys() {
        if id == start {
            let mut s = HashSet::new();
            s.insert(start);
            dom.insert(id, s);
        } else {
            dom.insert(id, all.clone());
        }
    }

    let mut order: Vec<BlockId> = blocks.keys().copied().filter(|&b| b != start).collect();
    order.sort_by_key(|b| b.0);

    let mut changed = true;
    while changed {
        changed = false;
        for &id in &order {
            let direct_preds = preds.get(&id).cloned().unwrap_or_default();
            let mut new_set = if direct_preds.is_empty() {
                HashSet::new()
            } else {
                let mut iter = direct_preds.iter();
                let first = iter.next().unwrap();
                let mut acc = dom[first].clone();
                for p in iter {
                    acc = acc.intersection(&dom[p]).copied().collect();
                }
                acc
            };
            new_set.insert(id);

            if new_set != dom[&id] {
                dom.insert(id, new_set);
                changed = true;
            }
        }
    }

    dom
}

/// Postdominators, symmetric over direct successors, seeded at the
/// (unique) return block.
pub fn postdominators_raw(
    blocks: &HashMap<BlockId, BasicBlock>,
    succs: &HashMap<BlockId, Vec<BlockId>>,
    return_block: BlockId,
) -> HashMap<BlockId, HashSet<BlockId>> {
    let all: HashSet<BlockId> = blocks.keys().copied().collect();
    let mut postdom: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();

    for &id in blocks.keys() {
        if id == return_block {
            let mut s = HashSet::new();
            s.insert(return_block);
            postdom.insert(id, s);
        } else {
            postdom.insert(id, all.clone());
        }
    }

    let mut order: Vec<BlockId> = blocks
        .keys()
        .copied()
        .filter(|&b| b != return_block)
        .collect();
    order.sort_by_key(|b| b.0);

    let mut changed = true;
    while changed {
        changed = false;
        for &id in &order {
            let direct_succs = succs.get(&id).cloned().unwrap_or_default();
            let mut new_set = if direct_succs.is_empty() {
                HashSet::new()
            } else {
                let mut iter = direct_succs.iter();
                let first = iter.next().unwrap();
                let mut acc = postdom[first].clone();
                for s in iter {
                    acc = acc.intersection(&postdom[s]).copied().collect();
                }
                acc
            };
            new_set.insert(id);

            if new_set != postdom[&id] {
                postdom.insert(id, new_set);
                changed = true;
            }
        }
    }

    postdom
}

/// Proper dominators: dominators minus the block itself.
pub fn proper(dominators: &HashSet<BlockId>, of: BlockId) -> HashSet<BlockId> {
    dominators.iter().copied().filter(|&b| b != of).collect()
}

/// The unique immediate (post)dominator of `of`, if one exists: the
/// proper dominator `D` whose own proper dominators are exactly
/// `of`'s proper dominators minus `D` itself.
pub fn immediate(
    dominators: &HashMap<BlockId, HashSet<BlockId>>,
    of: BlockId,
) -> Option<BlockId> {
    let of_proper = proper(&dominators[&of], of);
    of_proper.iter().copied().find(|&candidate| {
        let candidate_proper = proper(&dominators[&candidate], candidate);
        let mut expected = of_proper.clone();
        expected.remove(&candidate);
        candidate_proper == expected
    })
}

/// A natural loop: a strongly-connected subset of the successor graph
/// of size >= 2, enumerated once per back-edge (a back edge is an edge
/// whose head predominates its tail).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    pub header: BlockId,
    pub tail: BlockId,
    pub body: HashSet<BlockId>,
}

/// Enumerates natural loops by back-edge, one loop per back edge
/// found while scanning successors in block-id order.
pub fn loops(
    blocks: &HashMap<BlockId, BasicBlock>,
    succs: &HashMap<BlockId, Vec<BlockId>>,
    dominators: &HashMap<BlockId, HashSet<BlockId>>,
) -> Vec<Loop> {
    let mut found = Vec::new();
    let mut block_ids: Vec<BlockId> = blocks.keys().copied().collect();
    block_ids.sort_by_key(|b| b.0);

    for &tail in &block_ids {
        for &header in succs.get(&tail).unwrap_or(&Vec::new()) {
            if dominators[&tail].contains(&header) {
                let body = natural_loop_body(header, tail, blocks);
                if body.len() >= 2 {
                    found.push(Loop { header, tail, body });
                }
            }
        }
    }

    found
}

fn natural_loop_body(
    header: BlockId,
    tail: BlockId,
    blocks: &HashMap<BlockId, BasicBlock>,
) -> HashSet<BlockId> {
    let preds = predecessors(blocks);
    let mut body = HashSet::new();
    body.insert(header);
    body.insert(tail);

    let mut stack = vec![tail];
    while let Some(b) = stack.pop() {
        for &p in preds.get(&b).unwrap_or(&Vec::new()) {
            if body.insert(p) {
                stack.push(p);
            }
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::Instruction;
    use crate::types::{IrType, IrVariable, Vol};

    fn var(id: u32, ty: IrType) -> IrVariable {
        IrVariable::new(crate::types::VarId::new(id), ty)
    }

    /// `bb0` (header) branches into the body `bb1` or exit `bb2`;
    /// `bb1` jumps back to `bb0` — a single back edge, `bb1 -> bb0`.
    fn while_loop_blocks() -> HashMap<BlockId, BasicBlock> {
        let c = var(0, IrType::Bool);
        let header = BasicBlock::new(
            BlockId::new(0),
            vec![Instruction::Branch {
                cond: Vol::Variable(c),
                true_target: BlockId::new(1),
                false_target: BlockId::new(2),
            }],
        );
        let body = BasicBlock::new(
            BlockId::new(1),
            vec![Instruction::Jump { target: BlockId::new(0) }],
        );
        let exit = BasicBlock::new(BlockId::new(2), vec![Instruction::Return]);
        [(BlockId::new(0), header), (BlockId::new(1), body), (BlockId::new(2), exit)]
            .into_iter()
            .collect()
    }

    #[test]
    fn loops_finds_the_single_back_edge() {
        let blocks = while_loop_blocks();
        let start = BlockId::new(0);
        let preds = predecessors(&blocks);
        let succs = successors(&blocks);
        let dominators = predominators_raw(&blocks, &preds, start);

        let found = loops(&blocks, &succs, &dominators);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].header, BlockId::new(0));
        assert_eq!(found[0].tail, BlockId::new(1));
        assert!(found[0].body.contains(&BlockId::new(0)));
        assert!(found[0].body.contains(&BlockId::new(1)));
        assert!(!found[0].body.contains(&BlockId::new(2)));
    }

    #[test]
    fn straight_line_cfg_has_no_loops() {
        let header = BasicBlock::new(
            BlockId::new(0),
            vec![Instruction::Jump { target: BlockId::new(1) }],
        );
        let tail = BasicBlock::new(BlockId::new(1), vec![Instruction::Return]);
        let blocks: HashMap<BlockId, BasicBlock> =
            [(BlockId::new(0), header), (BlockId::new(1), tail)].into_iter().collect();
        let preds = predecessors(&blocks);
        let succs = successors(&blocks);
        let dominators = predominators_raw(&blocks, &preds, BlockId::new(0));

        assert!(loops(&blocks, &succs, &dominators).is_empty());
    }
}
