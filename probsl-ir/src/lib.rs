//! The SSA IR data model, verifier, and static analyses for SL (spec
//! §3, §4.A, §4.B).

pub mod analyses;
pub mod blocks;
pub mod dump;
pub mod instructions;
pub mod program;
pub mod types;
pub mod verify;

pub use analyses::Loop;
pub use blocks::BasicBlock;
pub use instructions::{BlockId, CompareOp, Instruction};
pub use program::{AnalysisCache, DebugInfo, InstructionClass, InstructionDebugInfo, IrProgram, ProgramPosition};
pub use types::{IrType, IrValue, IrVariable, VarId, Vol};
pub use verify::VerifierError;
