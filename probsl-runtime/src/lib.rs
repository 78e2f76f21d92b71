//! The sampling execution engine and interactive debugger controller
//! for SL (spec §4.C, §4.D, §4.F, §4.G).

pub mod debugger;
pub mod executor;
pub mod outline;
pub mod sample;
pub mod state;

pub use debugger::DebuggerController;
pub use executor::{Executor, RunLimits};
pub use outline::{generate as generate_outline, Outline};
pub use sample::{eval, step_sample, Sample};
pub use state::ExecutionState;
