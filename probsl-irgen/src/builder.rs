//! Accumulates basic blocks and debug info while lowering a program
//! (spec §6 "an IRGen pass must deliver an `IRProgram` satisfying all
//! invariants of §3, a `DebugInfo` with entries for every
//! source-statement-emitted instruction").

use crate::env::Env;
use probsl_ir::{
    BasicBlock, BlockId, DebugInfo, Instruction, InstructionClass, InstructionDebugInfo, IrProgram,
    IrType, IrVariable, ProgramPosition, VarId,
};
use probsl_source_map::{FileId, SourceMap};
use std::collections::HashMap;

pub struct Builder<'a> {
    blocks: HashMap<BlockId, Vec<Instruction>>,
    current: BlockId,
    next_block: u32,
    next_var: u32,
    pub env: Env,
    debug_info: DebugInfo,
    source_map: &'a SourceMap,
    file_id: FileId,
}

impl<'a> Builder<'a> {
    pub fn new(source_map: &'a SourceMap, file_id: FileId) -> Self {
        let mut blocks = HashMap::new();
        let start = BlockId::new(0);
        blocks.insert(start, Vec::new());

        Self {
            blocks,
            current: start,
            next_block: 1,
            next_var: 0,
            env: Env::new(),
            debug_info: DebugInfo::new(),
            source_map,
            file_id,
        }
    }

    pub fn start_block(&self) -> BlockId {
        BlockId::new(0)
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn set_current(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn fresh_block(&mut self) -> BlockId {
        let id = BlockId::new(self.next_block);
        self.next_block += 1;
        self.blocks.insert(id, Vec::new());
        id
    }

    pub fn fresh_var(&mut self, ty: IrType) -> IrVariable {
        let id = VarId::new(self.next_var);
        self.next_var += 1;
        IrVariable::new(id, ty)
    }

    /// Appends an instruction to the current block, returning its
    /// index (used to later patch a loop header's phi with its
    /// back-edge choice).
    pub fn emit(&mut self, instr: Instruction) -> usize {
        let block = self.blocks.get_mut(&self.current).expect("current block exists");
        block.push(instr);
        block.len() - 1
    }

    pub fn patch_phi(&mut self, block: BlockId, index: usize, choice: (BlockId, VarId)) {
        let instructions = self.blocks.get_mut(&block).expect("patched block exists");
        match &mut instructions[index] {
            Instruction::Phi { choices, .. } => choices.push(choice),
            other => panic!("patch_phi target at {block}@{index} is not a phi: {other:?}"),
        }
    }

    /// Resolves a byte-offset AST span against the registered source
    /// file, for use in `IrGenError`s raised during lowering.
    pub fn span(&self, span: probsl_parser::Span) -> probsl_diagnostics::SourceSpan {
        self.source_map
            .span_from_offsets(self.file_id, span.start, span.end)
            .expect("file registered in source map")
    }

    /// Records debug info for the instruction just emitted into the
    /// current block (spec §4.E), using the byte-offset span `span`.
    pub fn record_debug(&mut self, span: probsl_parser::Span, class: InstructionClass) {
        let index = self.blocks[&self.current].len() - 1;
        let position = ProgramPosition::new(self.current, index);
        let source_span = self
            .source_map
            .span_from_offsets(self.file_id, span.start, span.end)
            .expect("file registered in source map");

        self.debug_info.insert(
            position,
            InstructionDebugInfo {
                variables: self.env.debug_variables(),
                source_span,
                class,
            },
        );
    }

    /// Records debug info at end-of-file for the program's unique
    /// `Return` (spec §6).
    pub fn record_return_debug(&mut self) {
        let index = self.blocks[&self.current].len() - 1;
        let position = ProgramPosition::new(self.current, index);
        let file = self.source_map.get_file(self.file_id).expect("file registered");
        let source_span = probsl_diagnostics::SourceSpan::single_position(
            file.end_of_file_position(),
            self.file_id,
        );

        self.debug_info.insert(
            position,
            InstructionDebugInfo {
                variables: self.env.debug_variables(),
                source_span,
                class: InstructionClass::Return,
            },
        );
    }

    pub fn finish(self) -> IrProgram {
        let start = self.start_block();
        let blocks: Vec<BasicBlock> = self
            .blocks
            .into_iter()
            .map(|(id, instructions)| BasicBlock::new(id, instructions))
            .collect();
        IrProgram::new_trusted(blocks, start, self.debug_info)
    }
}
