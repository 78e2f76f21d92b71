//! The IR program, debug-info, and program positions (spec §3, §4.A,
//! §4.E).

use crate::analyses::{self, Loop};
use crate::blocks::BasicBlock;
use crate::instructions::{BlockId, Instruction};
use crate::types::VarId;
use crate::verify::{self, VerifierError};
use probsl_diagnostics::{program_bug, SourceSpan};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

/// A program point: a block and an instruction index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramPosition {
    pub block: BlockId,
    pub index: usize,
}

impl ProgramPosition {
    pub fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }
}

impl fmt::Display for ProgramPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.block, self.index)
    }
}

/// How a source-emitted instruction position should be shown to a
/// user (spec §3 "DebugInfo").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionClass {
    Simple,
    IfElseBranch,
    LoopBranch,
    Return,
}

/// Debug information attached to one source-emitted program position:
/// the mapping from in-scope source variable names to the IR variable
/// currently holding their value, plus the source range and the
/// statement's classification.
#[derive(Debug, Clone)]
pub struct InstructionDebugInfo {
    pub variables: HashMap<String, VarId>,
    pub source_span: SourceSpan,
    pub class: InstructionClass,
}

/// A partial mapping from program position to debug information;
/// positions with no corresponding source statement (e.g. phi fixups
/// inserted by the jump routine) are absent (spec §3 "DebugInfo").
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    entries: HashMap<ProgramPosition, InstructionDebugInfo>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: ProgramPosition, info: InstructionDebugInfo) {
        self.entries.insert(position, info);
    }

    /// spec §4.E `source_location_of`.
    pub fn source_location_of(&self, position: ProgramPosition) -> Option<SourceSpan> {
        self.entries.get(&position).map(|i| i.source_span)
    }

    /// spec §4.E `variables_at`.
    pub fn variables_at(&self, position: ProgramPosition) -> Option<&HashMap<String, VarId>> {
        self.entries.get(&position).map(|i| &i.variables)
    }

    pub fn class_at(&self, position: ProgramPosition) -> Option<InstructionClass> {
        self.entries.get(&position).map(|i| i.class)
    }

    pub fn has_entry(&self, position: ProgramPosition) -> bool {
        self.entries.contains_key(&position)
    }
}

/// Lazily computed, cached static analyses for one program (spec §4.B
/// "Results are caching-eligible ... since IR programs are immutable,
/// caching is safe").
#[derive(Default)]
pub struct AnalysisCache {
    predominators: OnceCell<HashMap<BlockId, std::collections::HashSet<BlockId>>>,
    postdominators: OnceCell<HashMap<BlockId, std::collections::HashSet<BlockId>>>,
    loops: OnceCell<Vec<Loop>>,
}

impl fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisCache").finish_non_exhaustive()
    }
}

/// The IR program: an immutable, verified block graph plus its
/// debug-info bridge (spec §3 "IR Program").
#[derive(Debug)]
pub struct IrProgram {
    blocks: HashMap<BlockId, BasicBlock>,
    start: BlockId,
    debug_info: DebugInfo,
    cache: AnalysisCache,
}

impl IrProgram {
    /// Construct and verify a program, returning every violation found
    /// (spec §8 property 1: construction succeeds iff every invariant
    /// in spec §3 holds).
    pub fn new(
        blocks: Vec<BasicBlock>,
        start: BlockId,
        debug_info: DebugInfo,
    ) -> Result<Self, Vec<VerifierError>> {
        let block_map: HashMap<BlockId, BasicBlock> =
            blocks.into_iter().map(|b| (b.id, b)).collect();

        verify::verify(&block_map, start)?;

        Ok(Self {
            blocks: block_map,
            start,
            debug_info,
            cache: AnalysisCache::default(),
        })
    }

    /// Like [`Self::new`], but a verifier failure is a `ProgramBug`
    /// (spec §4.A: "Verification failures are ... fatal — they
    /// indicate an IRGen bug, not user input error"). IRGen calls this
    /// rather than `new` since it should never hand the debugger a
    /// malformed program.
    pub fn new_trusted(
        blocks: Vec<BasicBlock>,
        start: BlockId,
        debug_info: DebugInfo,
    ) -> Self {
        match Self::new(blocks, start, debug_info) {
            Ok(program) => program,
            Err(errors) => program_bug(format!(
                "IR verifier rejected generated program: {}",
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            )),
        }
    }

    pub fn start_block(&self) -> BlockId {
        self.start
    }

    pub fn debug_info(&self) -> &DebugInfo {
        &self.debug_info
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    /// Iterates blocks in a deterministic (ascending id) order.
    pub fn blocks_in_order(&self) -> Vec<&BasicBlock> {
        let mut ids: Vec<BlockId> = self.blocks.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids.into_iter().map(|id| &self.blocks[&id]).collect()
    }

    /// Look up the instruction at a position; `None` if `index` is
    /// past the block's last instruction (e.g. past `return`).
    pub fn instruction_at(&self, position: ProgramPosition) -> Option<&Instruction> {
        self.blocks
            .get(&position.block)?
            .instructions
            .get(position.index)
    }

    pub fn return_block(&self) -> BlockId {
        self.blocks_in_order()
            .into_iter()
            .find(|b| matches!(b.terminator(), Instruction::Return))
            .expect("verified program has exactly one return block")
            .id
    }

    pub fn direct_predecessors(&self) -> HashMap<BlockId, Vec<BlockId>> {
        analyses::predecessors(&self.blocks)
    }

    pub fn direct_successors(&self) -> HashMap<BlockId, Vec<BlockId>> {
        analyses::successors(&self.blocks)
    }

    pub fn transitive_predecessors(&self, of: BlockId) -> std::collections::HashSet<BlockId> {
        analyses::transitive_predecessors(&self.blocks, of)
    }

    pub fn predominators(&self, of: BlockId) -> std::collections::HashSet<BlockId> {
        self.cache
            .predominators
            .get_or_init(|| {
                let preds = self.direct_predecessors();
                analyses::predominators_raw(&self.blocks, &preds, self.start)
            })
            .get(&of)
            .cloned()
            .unwrap_or_default()
    }

    pub fn postdominators(&self, of: BlockId) -> std::collections::HashSet<BlockId> {
        self.cache
            .postdominators
            .get_or_init(|| {
                let succs = self.direct_successors();
                analyses::postdominators_raw(&self.blocks, &succs, self.return_block())
            })
            .get(&of)
            .cloned()
            .unwrap_or_default()
    }

    pub fn immediate_predominator(&self, of: BlockId) -> Option<BlockId> {
        let all = self.cache.predominators.get_or_init(|| {
            let preds = self.direct_predecessors();
            analyses::predominators_raw(&self.blocks, &preds, self.start)
        });
        analyses::immediate(all, of)
    }

    pub fn immediate_postdominator(&self, of: BlockId) -> Option<BlockId> {
        let all = self.cache.postdominators.get_or_init(|| {
            let succs = self.direct_successors();
            analyses::postdominators_raw(&self.blocks, &succs, self.return_block())
        });
        analyses::immediate(all, of)
    }

    pub fn loops(&self) -> &[Loop] {
        self.cache.loops.get_or_init(|| {
            let succs = self.direct_successors();
            let preds = self.direct_predecessors();
            let dominators = analyses::predominators_raw(&self.blocks, &preds, self.start);
            analyses::loops(&self.blocks, &succs, &dominators)
        })
    }

    pub fn textual_dump(&self) -> String {
        crate::dump::dump_program(self)
    }
}
