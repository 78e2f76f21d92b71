//! Command parsing and pretty-printing for the `probsl` console
//! front-end (spec §6 "Console-facing API").
//!
//! The core debugger exposes its operations as API entry points on
//! `DebuggerController`; this module is the thin layer that turns a
//! line of text into a call on that API and a result back into
//! printed output.

use probsl_diagnostics::UserDebuggerError;
use probsl_ir::ProgramPosition;
use probsl_runtime::debugger::DebuggerController;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    DisplayPosition,
    DisplayVariables,
    StepOver,
    StepInto(bool),
    StepOut,
    Run,
    StateSave,
    StateRestore,
    StateDisplay,
    Exit,
}

/// Parses one console command line (spec §6's command grammar:
/// `display position | variables`, `step over | into true|false |
/// out`, `run`, `state save | restore | display`, `exit`).
pub fn parse_command(line: &str) -> Result<Command, UserDebuggerError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["display", "position"] => Ok(Command::DisplayPosition),
        ["display", "variables"] => Ok(Command::DisplayVariables),
        ["display", other] => Err(UserDebuggerError::BadArgument(format!(
            "display has no subcommand `{other}`, expected `position` or `variables`"
        ))),
        ["display"] => Err(UserDebuggerError::BadArgument(
            "display requires `position` or `variables`".to_string(),
        )),
        ["step", "over"] => Ok(Command::StepOver),
        ["step", "into", "true"] => Ok(Command::StepInto(true)),
        ["step", "into", "false"] => Ok(Command::StepInto(false)),
        ["step", "out"] => Ok(Command::StepOut),
        ["step", other, ..] => Err(UserDebuggerError::BadArgument(format!(
            "step has no subcommand `{other}`, expected `over`, `into true|false`, or `out`"
        ))),
        ["step"] => Err(UserDebuggerError::BadArgument(
            "step requires `over`, `into true|false`, or `out`".to_string(),
        )),
        ["run"] => Ok(Command::Run),
        ["state", "save"] => Ok(Command::StateSave),
        ["state", "restore"] => Ok(Command::StateRestore),
        ["state", "display"] => Ok(Command::StateDisplay),
        ["state", other] => Err(UserDebuggerError::BadArgument(format!(
            "state has no subcommand `{other}`, expected `save`, `restore`, or `display`"
        ))),
        ["state"] => Err(UserDebuggerError::BadArgument(
            "state requires `save`, `restore`, or `display`".to_string(),
        )),
        ["exit"] => Ok(Command::Exit),
        [] => Err(UserDebuggerError::BadArgument("empty command".to_string())),
        [unknown, ..] => Err(UserDebuggerError::UnknownCommand(unknown.to_string())),
    }
}

/// Runs one already-parsed command against the controller, printing
/// its result to stdout. Returns `true` if the session should keep
/// going (everything but `exit`).
pub fn run_command(controller: &mut DebuggerController, command: Command) -> bool {
    match command {
        Command::DisplayPosition => {
            print_position(controller.current_state().position);
            true
        }
        Command::DisplayVariables => {
            print_variables(controller);
            true
        }
        Command::StepOver => {
            report(controller.step_over());
            true
        }
        Command::StepInto(take_true) => {
            report(controller.step_into(take_true));
            true
        }
        Command::StepOut => {
            report(controller.step_out());
            true
        }
        Command::Run => {
            report(controller.run_until_end());
            true
        }
        Command::StateSave => {
            controller.save_state();
            println!("state saved");
            true
        }
        Command::StateRestore => {
            report(controller.restore_state());
            true
        }
        Command::StateDisplay => {
            print_position(controller.current_state().position);
            print_variables(controller);
            true
        }
        Command::Exit => false,
    }
}

fn report(result: Result<(), UserDebuggerError>) {
    match result {
        Ok(()) => println!("ok"),
        Err(e) => println!("error: {e}"),
    }
}

fn print_position(position: ProgramPosition) {
    println!("position: {position}");
}

fn print_variables(controller: &DebuggerController) {
    let samples = controller.samples();
    println!("{} live sample(s)", samples.len());
    for (i, sample) in samples.iter().enumerate() {
        let bindings: Vec<String> = sample.iter().map(|(name, value)| format!("{name} = {value}")).collect();
        println!("  [{i}] {}", bindings.join(", "));
    }
}
