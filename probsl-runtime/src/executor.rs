//! The stateless stepping engine (spec §4.D "Executor").

use crate::sample::{eval, step_sample};
use crate::state::ExecutionState;
use probsl_diagnostics::{program_bug, UserDebuggerError};
use probsl_ir::{Instruction, IrProgram, ProgramPosition};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Bounds how many worklist iterations `run_until` will take before
/// concluding the program diverges. A looping SL program with no
/// `observe` to narrow it down can run forever; this turns that into a
/// diagnosable failure instead of a hung console.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub max_steps: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self { max_steps: 1_000_000 }
    }
}

/// Advances execution states one instruction (or one control-flow
/// transfer) at a time. Holds only the program and a seedable RNG —
/// no position or sample state of its own (spec §4.D: "the executor is
/// stateless; it owns only the immutable program reference").
pub struct Executor {
    program: std::rc::Rc<IrProgram>,
    rng: StdRng,
    limits: RunLimits,
}

impl Executor {
    pub fn new(program: std::rc::Rc<IrProgram>, seed: u64, limits: RunLimits) -> Self {
        Self {
            program,
            rng: StdRng::seed_from_u64(seed),
            limits,
        }
    }

    pub fn program(&self) -> &IrProgram {
        &self.program
    }

    /// Consumes the leading phi prefix of `target`, resolving each
    /// phi's choice for the block control is arriving from, then
    /// lands on `target`'s first non-phi instruction (spec §4.D "a
    /// jump consumes the target's phi prefix before landing").
    fn jump_transfer(&self, from: probsl_ir::BlockId, target: probsl_ir::BlockId, samples: Vec<crate::sample::Sample>) -> ExecutionState {
        let block = self
            .program
            .block(target)
            .unwrap_or_else(|| program_bug(format!("jump to non-existent block {target}")));

        let mut next_samples = samples;
        for phi in block.phis() {
            let Instruction::Phi { dest, choices } = phi else {
                program_bug("block.phis() returned a non-phi instruction")
            };
            let source_var = choices
                .iter()
                .find(|(pred, _)| *pred == from)
                .map(|(_, var)| *var)
                .unwrap_or_else(|| {
                    program_bug(format!("phi in {target} has no choice for predecessor {from}"))
                });
            next_samples = next_samples
                .into_iter()
                .map(|mut s| {
                    let value = *s
                        .get(&source_var)
                        .unwrap_or_else(|| program_bug(format!("phi source {source_var} unbound")));
                    s.insert(dest.id, value);
                    s
                })
                .collect();
        }

        let position = ProgramPosition::new(target, block.phi_prefix_len());
        ExecutionState::new(position, next_samples)
    }

    /// Advances one execution state by one instruction, returning the
    /// resulting states: empty if every sample died (an `Observe`
    /// rejected them all), one for straight-line code or a jump, or
    /// two for a branch whose samples diverge (spec §4.D dispatch
    /// table).
    pub fn step(&mut self, state: &ExecutionState) -> Vec<ExecutionState> {
        let position = state.position;
        let instr = self
            .program
            .instruction_at(position)
            .unwrap_or_else(|| program_bug(format!("stepped past the end of block {}", position.block)));
        log::trace!("step {position}: {instr} ({} sample(s))", state.sample_count());

        match instr.clone() {
            Instruction::Return => program_bug("step() called on a Return instruction"),
            Instruction::Phi { .. } => program_bug("step() called directly on a Phi instruction"),
            Instruction::Jump { target } => {
                vec![self.jump_transfer(position.block, target, state.samples().to_vec())]
            }
            Instruction::Branch {
                cond,
                true_target,
                false_target,
            } => {
                let branch_value = |sample: &crate::sample::Sample| {
                    eval(sample, &cond).as_bool().unwrap_or_else(|| {
                        program_bug(format!("branch condition {cond} is not a bool"))
                    })
                };
                let true_state = state.filter(|sample| branch_value(sample));
                let false_state = state.filter(|sample| !branch_value(sample));

                let mut out = Vec::with_capacity(2);
                if true_state.has_samples() {
                    out.push(self.jump_transfer(
                        position.block,
                        true_target,
                        true_state.samples().to_vec(),
                    ));
                }
                if false_state.has_samples() {
                    out.push(self.jump_transfer(
                        position.block,
                        false_target,
                        false_state.samples().to_vec(),
                    ));
                }
                out
            }
            Instruction::Observe { cond } => {
                let survivors = state.filter(|sample| {
                    eval(sample, &cond).as_bool().unwrap_or_else(|| {
                        program_bug(format!("observe condition {cond} is not a bool"))
                    })
                });
                if !survivors.has_samples() {
                    Vec::new()
                } else {
                    let next = ProgramPosition::new(position.block, position.index + 1);
                    vec![survivors.with_samples(next, survivors.samples().to_vec())]
                }
            }
            _ => {
                let mapped: Vec<_> = state
                    .samples()
                    .iter()
                    .map(|s| step_sample(s, instr, &mut self.rng))
                    .map(|s| s.unwrap_or_else(|| program_bug("non-observe instruction dropped a sample")))
                    .collect();
                let next = ProgramPosition::new(position.block, position.index + 1);
                vec![state.with_samples(next, mapped)]
            }
        }
    }

    /// Steps into one arm of the branch at `state`'s position
    /// explicitly, used by source-level "step into" and the outline
    /// generator (spec §4.F, §4.G). Returns `None` if the current
    /// instruction isn't a branch, or if the chosen arm has no live
    /// samples.
    pub fn step_into_branch(&self, state: &ExecutionState, take_true: bool) -> Option<ExecutionState> {
        let instr = self.program.instruction_at(state.position)?.clone();
        let Instruction::Branch {
            cond,
            true_target,
            false_target,
        } = instr
        else {
            return None;
        };

        let mut bag = Vec::new();
        for sample in state.samples() {
            let v = eval(sample, &cond)
                .as_bool()
                .unwrap_or_else(|| program_bug(format!("branch condition {cond} is not a bool")));
            if v == take_true {
                bag.push(sample.clone());
            }
        }
        if bag.is_empty() {
            return None;
        }

        let target = if take_true { true_target } else { false_target };
        Some(self.jump_transfer(state.position.block, target, bag))
    }

    /// Runs `state` to a fixed point: every live sample either reaches
    /// `Return` or a position where `stop` holds, then merges those
    /// finished states back into one (spec §4.D "Run until
    /// condition"). `None` if every sample died along the way.
    pub fn run_until(
        &mut self,
        state: ExecutionState,
        stop: impl Fn(ProgramPosition) -> bool,
    ) -> Option<ExecutionState> {
        let mut worklist = vec![state];
        let mut finished = Vec::new();
        let mut steps = 0usize;

        while let Some(s) = worklist.pop() {
            steps += 1;
            if steps > self.limits.max_steps {
                program_bug(format!(
                    "run_until exceeded the step budget of {}; the program likely diverges",
                    self.limits.max_steps
                ));
            }

            if stop(s.position) || matches!(self.program.instruction_at(s.position), Some(Instruction::Return)) {
                finished.push(s);
                continue;
            }

            worklist.extend(self.step(&s));
        }

        log::debug!("run_until settled after {steps} step(s), {} finished state(s)", finished.len());
        ExecutionState::merged(&finished)
    }

    pub fn run_until_end(&mut self, state: ExecutionState) -> Option<ExecutionState> {
        self.run_until(state, |_| false)
    }

    /// A constrained single-path step used for source-level "step
    /// over" (spec §4.D "Single-branch step"): advances through
    /// straight-line code and phi fixups until `stop` holds or
    /// `Return` is reached, but refuses to follow a branch whose two
    /// arms both keep live samples.
    ///
    /// Errors with `AtBranchInstruction` if `state` itself sits on a
    /// user-visible branch (the caller should `step into` instead), or
    /// `MultipleBranches` if a branch encountered mid-traversal splits
    /// the population both ways. A branch taken unambiguously (all
    /// samples go one way) is not an error — it is a degenerate case
    /// of "single path".
    pub fn step_single_branch(
        &mut self,
        state: &ExecutionState,
        stop: impl Fn(ProgramPosition) -> bool,
    ) -> Result<Option<ExecutionState>, UserDebuggerError> {
        let mut current = state.clone();
        let mut first = true;

        loop {
            if stop(current.position)
                || matches!(self.program.instruction_at(current.position), Some(Instruction::Return))
            {
                return Ok(Some(current));
            }

            let is_branch = matches!(
                self.program.instruction_at(current.position),
                Some(Instruction::Branch { .. })
            );
            if is_branch && first {
                return Err(UserDebuggerError::AtBranchInstruction);
            }
            first = false;

            let mut successors = self.step(&current);
            match successors.len() {
                0 => return Ok(None),
                1 => current = successors.pop().unwrap(),
                _ => return Err(UserDebuggerError::MultipleBranches),
            }
        }
    }
}
