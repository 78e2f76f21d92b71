//! Logging configuration for the `probsl` console front-end.
//!
//! Debugger-controller and executor operations log at `debug`/`trace`;
//! IRGen and parse failures log at `error` before being surfaced to
//! the console layer.
//!
//! Set `RUST_LOG` to control verbosity at runtime:
//!
//! ```bash
//! RUST_LOG=info probsl run program.sl   # session-level progress
//! RUST_LOG=debug probsl run program.sl  # per-step detail
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes logging with sensible defaults (Warn level). Only
/// initializes once; subsequent calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {}:{} - {}",
                    record.level(),
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .init();
    });
}

/// Initializes logging from the `RUST_LOG` environment variable,
/// defaulting to Warn if unset.
pub fn init_from_env() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Initializes logging for tests: test-friendly output, quiet unless
/// `RUST_LOG` is set explicitly.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_test();
        init_test();
        init_test();
    }

    #[test]
    fn test_log_levels() {
        init_test();
        log::error!("test error message");
        log::warn!("test warning message");
        log::info!("test info message");
        log::debug!("test debug message");
        log::trace!("test trace message");
    }
}
