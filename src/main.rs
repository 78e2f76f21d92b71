//! probsl - interactive sampling debugger for the SL probabilistic
//! language.
//!
//! # Usage
//!
//! ```bash
//! # Step through a program interactively (reads commands from stdin)
//! probsl run program.sl
//!
//! # Drive a session non-interactively with a batch of commands
//! probsl run program.sl --commands "step over;display variables;run;exit"
//!
//! # Reproduce a prior session exactly
//! probsl run program.sl --seed 1234
//!
//! # Inspect the lowered IR before running
//! probsl run program.sl --dump-ir
//! ```

mod console;
mod logging;

use clap::Parser;
use probsl_diagnostics::ErrorFormatter;
use probsl_runtime::debugger::DebuggerController;
use probsl_runtime::executor::RunLimits;
use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser)]
#[command(name = "probsl")]
#[command(version = "0.1.0")]
#[command(about = "Interactive sampling debugger for the SL probabilistic language", long_about = None)]
struct Cli {
    /// Path to the SL source file
    file: PathBuf,

    /// Number of samples to draw for the initial execution state
    #[arg(long, default_value_t = 100)]
    samples: usize,

    /// Semicolon-separated batch of console commands; if omitted,
    /// commands are read interactively from stdin
    #[arg(long)]
    commands: Option<String>,

    /// RNG seed; defaults to a process-derived seed, always echoed so
    /// a session can be reproduced after the fact
    #[arg(long)]
    seed: Option<u64>,

    /// Print the lowered IR's stable textual dump before starting
    #[arg(long)]
    dump_ir: bool,
}

fn main() {
    logging::init_from_env();
    let cli = Cli::parse();

    if let Err(message) = run(cli) {
        eprintln!("{message}");
        process::exit(1);
    }
}

fn process_derived_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ (process::id() as u64)
}

fn run(cli: Cli) -> Result<(), String> {
    let source = std::fs::read_to_string(&cli.file)
        .map_err(|e| format!("failed to read {}: {e}", cli.file.display()))?;
    let file_name = cli.file.to_string_lossy().into_owned();

    let compiled = probsl_irgen::generate(&file_name, &source).map_err(|err| {
        let diagnostic = err.to_diagnostic();
        ErrorFormatter::new().format(&diagnostic, &error_source_map(&file_name, &source))
    })?;

    if cli.dump_ir {
        print!("{}", compiled.program.textual_dump());
    }

    let seed = cli.seed.unwrap_or_else(process_derived_seed);
    log::info!("session seed: {seed}");

    let program = Rc::new(compiled.program);
    let mut controller = DebuggerController::new(program, cli.samples, seed, RunLimits::default());

    match cli.commands {
        Some(batch) => run_batch(&mut controller, &batch),
        None => run_interactive(&mut controller),
    }

    Ok(())
}

/// A failed `generate` never hands back the `SourceMap` it built
/// internally, so error rendering rebuilds an equivalent one: the
/// first (and only) file registered gets the same `FileId` either
/// way, so spans line up.
fn error_source_map(file_name: &str, source: &str) -> probsl_source_map::SourceMap {
    let mut source_map = probsl_source_map::SourceMap::new();
    source_map.add_file(file_name.to_string(), source.to_string());
    source_map
}

fn run_batch(controller: &mut DebuggerController, batch: &str) {
    for command_text in batch.split(';') {
        let command_text = command_text.trim();
        if command_text.is_empty() {
            continue;
        }
        if !dispatch(controller, command_text) {
            break;
        }
    }
}

fn run_interactive(controller: &mut DebuggerController) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !dispatch(controller, line) {
            break;
        }
    }
}

fn dispatch(controller: &mut DebuggerController, line: &str) -> bool {
    match console::parse_command(line) {
        Ok(command) => console::run_command(controller, command),
        Err(e) => {
            println!("error: {e}");
            true
        }
    }
}
