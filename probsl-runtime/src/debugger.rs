//! The interactive debugger controller (spec §4.F).

use crate::executor::{Executor, RunLimits};
use crate::state::ExecutionState;
use probsl_diagnostics::{SourceSpan, UserDebuggerError};
use probsl_ir::{Instruction, IrProgram, IrValue, ProgramPosition};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Drives one debugging session: the current execution state, a stack
/// of saved states, and the executor that advances them (spec §4.F
/// "Debugger controller").
pub struct DebuggerController {
    program: Rc<IrProgram>,
    executor: Executor,
    current: ExecutionState,
    stack: Vec<ExecutionState>,
}

impl DebuggerController {
    pub fn new(program: Rc<IrProgram>, sample_count: usize, seed: u64, limits: RunLimits) -> Self {
        let start = ProgramPosition::new(program.start_block(), 0);
        let current = ExecutionState::initial(start, sample_count);
        let executor = Executor::new(program.clone(), seed, limits);
        Self {
            program,
            executor,
            current,
            stack: Vec::new(),
        }
    }

    pub fn current_state(&self) -> &ExecutionState {
        &self.current
    }

    pub fn is_terminated(&self) -> bool {
        matches!(
            self.program.instruction_at(self.current.position),
            Some(Instruction::Return)
        )
    }

    fn require_live(&self) -> Result<(), UserDebuggerError> {
        if self.is_terminated() {
            Err(UserDebuggerError::AlreadyTerminated)
        } else {
            Ok(())
        }
    }

    /// Advances past the current source statement without descending
    /// into a branch: errors rather than picking a side arbitrarily
    /// (spec §4.D "single-branch step", §4.F `step_over`).
    pub fn step_over(&mut self) -> Result<(), UserDebuggerError> {
        self.require_live()?;
        log::debug!("step over from {}", self.current.position);
        let debug_info = self.program.debug_info();
        let start_position = self.current.position;
        let state = self.current.clone();
        let result = self.executor.step_single_branch(&state, |pos| {
            pos != start_position && debug_info.has_entry(pos)
        })?;
        self.current = result.unwrap_or_else(|| self.current.emptied());
        Ok(())
    }

    /// Descends explicitly into one arm of the branch at the current
    /// position; on straight-line code it is equivalent to a single
    /// instruction step (spec §4.F `step_into`).
    pub fn step_into(&mut self, take_true: bool) -> Result<(), UserDebuggerError> {
        self.require_live()?;
        log::debug!("step into {take_true} from {}", self.current.position);
        let is_branch = matches!(
            self.program.instruction_at(self.current.position),
            Some(Instruction::Branch { .. })
        );

        if is_branch {
            match self.executor.step_into_branch(&self.current, take_true) {
                Some(next) => {
                    self.current = next;
                    Ok(())
                }
                None => Err(UserDebuggerError::NoLiveSamplesInBranch),
            }
        } else {
            let mut successors = self.executor.step(&self.current);
            self.current = successors.pop().unwrap_or_else(|| self.current.emptied());
            Ok(())
        }
    }

    /// Equivalent to `restore_state(); step_over()` (spec §4.F
    /// `step_out`): pops back to the saved state and advances it past
    /// one statement. Errors with `EmptyStateStack` if nothing was
    /// ever saved.
    pub fn step_out(&mut self) -> Result<(), UserDebuggerError> {
        log::debug!("step out from {}", self.current.position);
        self.restore_state()?;
        self.step_over()
    }

    /// Runs every live sample to completion (spec §4.F `run`).
    pub fn run_until_end(&mut self) -> Result<(), UserDebuggerError> {
        self.require_live()?;
        let state = self.current.clone();
        self.current = self
            .executor
            .run_until_end(state)
            .unwrap_or_else(|| self.current.emptied());
        Ok(())
    }

    /// Pushes the current state onto the save stack (O(1): states
    /// share their sample population by reference).
    pub fn save_state(&mut self) {
        self.stack.push(self.current.clone());
    }

    pub fn restore_state(&mut self) -> Result<(), UserDebuggerError> {
        self.current = self.stack.pop().ok_or(UserDebuggerError::EmptyStateStack)?;
        Ok(())
    }

    pub fn current_source_location(&self) -> Option<SourceSpan> {
        self.program.debug_info().source_location_of(self.current.position)
    }

    /// Translates the live sample population through the debug-info
    /// bridge into source-variable-name bindings (spec §4.E, §4.F
    /// `samples`). Shadowed names are disambiguated the way IRGen
    /// names them (`x`, `x#2`, `x#3`, ...), so no further renaming
    /// happens here.
    pub fn samples(&self) -> Vec<BTreeMap<String, IrValue>> {
        let Some(variables) = self.program.debug_info().variables_at(self.current.position) else {
            return Vec::new();
        };

        self.current
            .samples()
            .iter()
            .map(|sample| {
                variables
                    .iter()
                    .filter_map(|(name, var_id)| sample.get(var_id).map(|v| (name.clone(), *v)))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probsl_ir::{
        BasicBlock, BlockId, DebugInfo, InstructionClass, InstructionDebugInfo, IrType, IrVariable,
        VarId, Vol,
    };
    use std::collections::HashMap;

    fn var(id: u32, ty: IrType) -> IrVariable {
        IrVariable::new(VarId::new(id), ty)
    }

    fn dummy_span() -> SourceSpan {
        SourceSpan::new(
            probsl_diagnostics::SourcePosition::new(1, 1, 0),
            probsl_diagnostics::SourcePosition::new(1, 1, 0),
            probsl_diagnostics::FileId::new(0),
        )
    }

    fn two_statement_program() -> IrProgram {
        let x = var(0, IrType::Int);
        let y = var(1, IrType::Int);
        let block = BasicBlock::new(
            BlockId::new(0),
            vec![
                Instruction::Assign {
                    dest: x,
                    value: Vol::IntLiteral(1),
                },
                Instruction::Assign {
                    dest: y,
                    value: Vol::IntLiteral(2),
                },
                Instruction::Return,
            ],
        );
        let mut debug_info = DebugInfo::new();
        let pos0 = ProgramPosition::new(BlockId::new(0), 0);
        let pos1 = ProgramPosition::new(BlockId::new(0), 1);
        let mut vars0 = HashMap::new();
        vars0.insert("x".to_string(), VarId::new(0));
        debug_info.insert(
            pos0,
            InstructionDebugInfo {
                variables: vars0,
                source_span: dummy_span(),
                class: InstructionClass::Simple,
            },
        );
        let mut vars1 = HashMap::new();
        vars1.insert("x".to_string(), VarId::new(0));
        vars1.insert("y".to_string(), VarId::new(1));
        debug_info.insert(
            pos1,
            InstructionDebugInfo {
                variables: vars1,
                source_span: dummy_span(),
                class: InstructionClass::Simple,
            },
        );
        IrProgram::new(vec![block], BlockId::new(0), debug_info).unwrap()
    }

    /// A branch on a constant-true condition, so the false arm never
    /// keeps any live samples: `bb0` branches straight to `bb1`/`bb2`,
    /// both of which jump on to the shared `bb3` return.
    fn dead_false_arm_program() -> IrProgram {
        let bb0 = BasicBlock::new(
            BlockId::new(0),
            vec![Instruction::Branch {
                cond: Vol::BoolLiteral(true),
                true_target: BlockId::new(1),
                false_target: BlockId::new(2),
            }],
        );
        let bb1 = BasicBlock::new(
            BlockId::new(1),
            vec![Instruction::Jump { target: BlockId::new(3) }],
        );
        let bb2 = BasicBlock::new(
            BlockId::new(2),
            vec![Instruction::Jump { target: BlockId::new(3) }],
        );
        let bb3 = BasicBlock::new(BlockId::new(3), vec![Instruction::Return]);
        IrProgram::new(vec![bb0, bb1, bb2, bb3], BlockId::new(0), DebugInfo::new()).unwrap()
    }

    #[test]
    fn step_into_a_branch_with_no_surviving_samples_errors() {
        let program = Rc::new(dead_false_arm_program());
        let mut dbg = DebuggerController::new(program, 3, 0, RunLimits::default());
        assert_eq!(
            dbg.step_into(false).unwrap_err(),
            UserDebuggerError::NoLiveSamplesInBranch
        );
        // the true arm still works, since every sample took it.
        dbg.step_into(true).unwrap();
        assert_eq!(dbg.current_state().position.block, BlockId::new(1));
    }

    #[test]
    fn step_out_restores_then_steps_over() {
        let program = Rc::new(two_statement_program());
        let mut dbg = DebuggerController::new(program, 1, 0, RunLimits::default());
        dbg.save_state();
        dbg.step_over().unwrap();
        dbg.step_over().unwrap();
        assert!(dbg.is_terminated());
        dbg.step_out().unwrap();
        assert_eq!(dbg.current_state().position.index, 1);
    }

    #[test]
    fn step_out_with_empty_stack_errors() {
        let program = Rc::new(two_statement_program());
        let mut dbg = DebuggerController::new(program, 1, 0, RunLimits::default());
        assert_eq!(
            dbg.step_out().unwrap_err(),
            UserDebuggerError::EmptyStateStack
        );
    }

    #[test]
    fn step_over_advances_to_the_next_debug_position() {
        let program = Rc::new(two_statement_program());
        let mut dbg = DebuggerController::new(program, 2, 0, RunLimits::default());
        dbg.step_over().unwrap();
        assert_eq!(dbg.current_state().position.index, 1);
        let samples = dbg.samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0][&"x".to_string()], IrValue::Int(1));
    }

    #[test]
    fn run_until_end_then_step_errors_already_terminated() {
        let program = Rc::new(two_statement_program());
        let mut dbg = DebuggerController::new(program, 1, 0, RunLimits::default());
        dbg.run_until_end().unwrap();
        assert!(dbg.is_terminated());
        assert_eq!(dbg.step_over().unwrap_err(), UserDebuggerError::AlreadyTerminated);
    }

    #[test]
    fn save_and_restore_round_trip() {
        let program = Rc::new(two_statement_program());
        let mut dbg = DebuggerController::new(program, 1, 0, RunLimits::default());
        dbg.save_state();
        dbg.step_over().unwrap();
        assert_eq!(dbg.current_state().position.index, 1);
        dbg.restore_state().unwrap();
        assert_eq!(dbg.current_state().position.index, 0);
    }

    #[test]
    fn restore_with_empty_stack_errors() {
        let program = Rc::new(two_statement_program());
        let mut dbg = DebuggerController::new(program, 1, 0, RunLimits::default());
        assert_eq!(
            dbg.restore_state().unwrap_err(),
            UserDebuggerError::EmptyStateStack
        );
    }
}
