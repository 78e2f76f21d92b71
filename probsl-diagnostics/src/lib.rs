//! Diagnostic rendering and the SL error taxonomy (spec §7).
//!
//! Three error families are distinguished here, matching the
//! propagation rules of spec §7:
//!
//! - [`ProgramBug`] is not a value type — it is raised via
//!   [`program_bug`], which logs at `error` and panics. It can only
//!   arise from a verifier bug or a malformed IR program, never from
//!   user input, so unwinding the process is the correct response.
//! - [`UserDebuggerError`] is recoverable and returned to the console
//!   layer, which prints it and re-prompts.
//! - [`IrGenError`] is recoverable at compile time and prevents the
//!   debugger from ever starting; it carries a [`SourceSpan`] so it can
//!   be rendered as a [`Diagnostic`].

use std::fmt;

pub use probsl_source_map::{FileId, SourceMap, SourcePosition, SourceSpan};

/// Severity level for a rendered diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single diagnostic message anchored to a source span.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub span: SourceSpan,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Renders diagnostics the way the console front-end prints them:
/// a `-->` location line, the offending source line, and a caret
/// underline, optionally colored.
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    pub fn format(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let mut out = String::new();
        let (sev_color, reset) = if self.use_colors {
            (
                match diagnostic.severity {
                    DiagnosticSeverity::Error => "\x1b[31m",
                    DiagnosticSeverity::Warning => "\x1b[33m",
                    DiagnosticSeverity::Info => "\x1b[36m",
                },
                "\x1b[0m",
            )
        } else {
            ("", "")
        };

        out.push_str(&format!(
            "{sev_color}{}{reset}: {}\n",
            diagnostic.severity, diagnostic.message
        ));

        if let Some(file) = source_map.get_file(diagnostic.span.file_id) {
            out.push_str(&format!(
                "  --> {}:{}:{}\n",
                file.name, diagnostic.span.start.line, diagnostic.span.start.column
            ));

            if let Some(line) = source_map.get_line(diagnostic.span.file_id, diagnostic.span.start.line) {
                let line_num = diagnostic.span.start.line.to_string();
                out.push_str(&format!("{:width$} |\n", "", width = line_num.len()));
                out.push_str(&format!("{line_num} | {line}\n"));

                let padding = " ".repeat(diagnostic.span.start.column.saturating_sub(1));
                let underline_len = if diagnostic.span.start.line == diagnostic.span.end.line {
                    diagnostic
                        .span
                        .end
                        .column
                        .saturating_sub(diagnostic.span.start.column)
                        .max(1)
                } else {
                    1
                };
                out.push_str(&format!(
                    "{:width$} | {padding}{}\n",
                    "",
                    "^".repeat(underline_len),
                    width = line_num.len()
                ));
            }
        }

        for note in &diagnostic.notes {
            out.push_str(&format!("  note: {note}\n"));
        }

        out
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Raise a `ProgramBug` (spec §7): log it and abort the process.
///
/// `ProgramBug`s indicate a verifier or IRGen defect, never a user
/// mistake, so they are not recoverable — callers never see a `Result`
/// for this path.
#[track_caller]
pub fn program_bug(message: impl fmt::Display) -> ! {
    log::error!("program bug: {message}");
    panic!("program bug: {message}");
}

/// Recoverable errors surfaced from the debugger controller to the
/// console layer (spec §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserDebuggerError {
    /// `step over` would need to follow two live branches.
    MultipleBranches,
    /// `step over` was invoked while sitting at a user-visible branch.
    AtBranchInstruction,
    /// The execution state has already reached `Return`.
    AlreadyTerminated,
    /// `state restore` with nothing on the stack.
    EmptyStateStack,
    /// `step into` chose a branch with no surviving samples.
    NoLiveSamplesInBranch,
    /// Console-layer only: an unrecognized command name.
    UnknownCommand(String),
    /// Console-layer only: a command received malformed arguments.
    BadArgument(String),
}

impl fmt::Display for UserDebuggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleBranches => {
                write!(f, "step over would cross a branch with two live paths")
            }
            Self::AtBranchInstruction => {
                write!(f, "already at a branch instruction; use `step into`")
            }
            Self::AlreadyTerminated => write!(f, "program has already terminated"),
            Self::EmptyStateStack => write!(f, "no saved state to restore"),
            Self::NoLiveSamplesInBranch => {
                write!(f, "no samples survive taking that branch")
            }
            Self::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
            Self::BadArgument(msg) => write!(f, "bad argument: {msg}"),
        }
    }
}

impl std::error::Error for UserDebuggerError {}

/// Recoverable compile-time errors raised by IRGen (spec §7).
#[derive(Debug, Clone)]
pub enum IrGenError {
    ParseFailure { message: String, span: SourceSpan },
    TypeMismatch { message: String, span: SourceSpan },
    UseBeforeDeclaration { name: String, span: SourceSpan },
    DuplicateDeclaration { name: String, span: SourceSpan },
    DiscreteProbabilitiesNotSummingToOne { sum: f64, span: SourceSpan },
}

impl IrGenError {
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::ParseFailure { span, .. }
            | Self::TypeMismatch { span, .. }
            | Self::UseBeforeDeclaration { span, .. }
            | Self::DuplicateDeclaration { span, .. }
            | Self::DiscreteProbabilitiesNotSummingToOne { span, .. } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string(), self.span())
    }
}

impl fmt::Display for IrGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseFailure { message, .. } => write!(f, "parse error: {message}"),
            Self::TypeMismatch { message, .. } => write!(f, "type error: {message}"),
            Self::UseBeforeDeclaration { name, .. } => {
                write!(f, "use of `{name}` before declaration")
            }
            Self::DuplicateDeclaration { name, .. } => {
                write!(f, "duplicate declaration of `{name}`")
            }
            Self::DiscreteProbabilitiesNotSummingToOne { sum, .. } => write!(
                f,
                "discrete distribution probabilities sum to {sum}, expected 1.0 (within 1e-9)"
            ),
        }
    }
}

impl std::error::Error for IrGenError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_a_diagnostic() {
        let mut map = SourceMap::new();
        let file = map.add_file("test.sl".into(), "int x = 1\n".into());
        let span = SourceSpan::new(
            SourcePosition::new(1, 5, 4),
            SourcePosition::new(1, 6, 5),
            file,
        );

        let diag = Diagnostic::error("unexpected token", span).note("check your syntax");
        let rendered = ErrorFormatter::new().format(&diag, &map);

        assert!(rendered.contains("error: unexpected token"));
        assert!(rendered.contains("test.sl:1:5"));
        assert!(rendered.contains("note: check your syntax"));
    }

    #[test]
    fn user_debugger_error_messages() {
        assert_eq!(
            UserDebuggerError::EmptyStateStack.to_string(),
            "no saved state to restore"
        );
    }
}
