//! Execution state: a program position paired with a population of
//! live samples (spec §4.D "Execution state").

use crate::sample::Sample;
use probsl_ir::ProgramPosition;
use std::rc::Rc;

/// A value object: a program position plus the multiset of samples
/// still alive there. Cheap to clone — the sample vector is
/// reference-counted, so pushing a copy onto the debugger's state
/// stack (spec §4.F `save_state`) does not clone the population.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    pub position: ProgramPosition,
    samples: Rc<Vec<Sample>>,
}

impl ExecutionState {
    pub fn new(position: ProgramPosition, samples: Vec<Sample>) -> Self {
        Self {
            position,
            samples: Rc::new(samples),
        }
    }

    /// `n` independent samples at the program's start, each with an
    /// empty binding environment (spec §4.D `initial`).
    pub fn initial(start: ProgramPosition, n: usize) -> Self {
        Self::new(start, vec![Sample::new(); n])
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// A state is live iff its sample multiset is nonempty.
    pub fn has_samples(&self) -> bool {
        !self.samples.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Moves to a new position, replacing the sample population
    /// wholesale (used once per instruction step).
    pub fn with_samples(&self, position: ProgramPosition, samples: Vec<Sample>) -> Self {
        Self::new(position, samples)
    }

    /// Keeps the position, dropping every sample (used when a path
    /// dies mid-step without landing on a stop position).
    pub fn emptied(&self) -> Self {
        Self::new(self.position, Vec::new())
    }

    /// Keeps the position, keeping only the samples matching `pred`
    /// (spec §4.D `filter`): the named partitioning operation branch
    /// and observe dispatch are both built from.
    pub fn filter(&self, pred: impl Fn(&Sample) -> bool) -> Self {
        let kept: Vec<Sample> = self.samples.iter().filter(|s| pred(s)).cloned().collect();
        Self::new(self.position, kept)
    }

    /// Merges several states that share a position into one (spec
    /// §4.D `run_until`: the worklist's finished states are merged by
    /// concatenating their populations). Returns `None` for an empty
    /// slice; panics (a program bug, caught by callers) if positions
    /// differ — callers only merge states gathered at the same stop
    /// condition.
    pub fn merged(states: &[ExecutionState]) -> Option<ExecutionState> {
        let first = states.first()?;
        let position = first.position;
        let mut all = Vec::new();
        for s in states {
            debug_assert_eq!(s.position, position, "merged states must share a position");
            all.extend(s.samples.iter().cloned());
        }
        Some(ExecutionState::new(position, all))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probsl_ir::BlockId;

    #[test]
    fn initial_state_has_n_empty_samples() {
        let pos = ProgramPosition::new(BlockId::new(0), 0);
        let state = ExecutionState::initial(pos, 3);
        assert_eq!(state.sample_count(), 3);
        assert!(state.has_samples());
        assert!(state.samples()[0].is_empty());
    }

    #[test]
    fn merge_concatenates_populations() {
        let pos = ProgramPosition::new(BlockId::new(0), 0);
        let a = ExecutionState::new(pos, vec![Sample::new()]);
        let b = ExecutionState::new(pos, vec![Sample::new(), Sample::new()]);
        let merged = ExecutionState::merged(&[a, b]).unwrap();
        assert_eq!(merged.sample_count(), 3);
    }

    #[test]
    fn filter_keeps_only_matching_samples_at_the_same_position() {
        let pos = ProgramPosition::new(BlockId::new(0), 0);
        let state = ExecutionState::new(pos, vec![Sample::new(), Sample::new(), Sample::new()]);
        let mut toggle = true;
        let kept = state.filter(|_| {
            toggle = !toggle;
            toggle
        });
        assert_eq!(kept.position, pos);
        assert_eq!(kept.sample_count(), 1);
    }

    #[test]
    fn cloning_a_state_is_cheap_rc_sharing() {
        let pos = ProgramPosition::new(BlockId::new(0), 0);
        let state = ExecutionState::new(pos, vec![Sample::new(); 100]);
        let clone = state.clone();
        assert!(Rc::ptr_eq(&state.samples, &clone.samples));
    }
}
