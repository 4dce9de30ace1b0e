// ABOUTME: Diagnostics sink and runtime error types for the SAGA pipeline

use thiserror::Error;

/// Replaces the original implementation's static `Error.had_error` /
/// `had_runtime_error` class fields (spec.md §5, Design Notes §9) with an
/// explicit object threaded through lex -> parse -> resolve. Diagnostics
/// accumulate instead of aborting, matching spec.md §7's per-phase table.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub had_error: bool,
    pub had_runtime_error: bool,
    pub messages: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    fn report(&mut self, line: u32, column: u32, message: impl AsRef<str>) {
        let line_text = format!(
            "SAGA::[line {}, column {}] Error: {}",
            line,
            column,
            message.as_ref()
        );
        println!("{}", line_text);
        self.messages.push(line_text);
        self.had_error = true;
    }

    pub fn lex_error(&mut self, line: u32, column: u32, message: impl AsRef<str>) {
        self.report(line, column, message);
    }

    pub fn parse_error(&mut self, line: u32, column: u32, message: impl AsRef<str>) {
        self.report(line, column, message);
    }

    pub fn resolve_error(&mut self, line: u32, column: u32, message: impl AsRef<str>) {
        self.report(line, column, message);
    }

    pub fn runtime_error(&mut self, line: u32, column: u32, message: impl AsRef<str>) {
        let line_text = format!(
            "SAGA::[line {}, column {}] Error: {}",
            line,
            column,
            message.as_ref()
        );
        println!("{}", line_text);
        self.messages.push(line_text);
        self.had_runtime_error = true;
    }

    /// Clears the static-error flag between REPL lines (spec.md §5); a
    /// malformed line must not poison the rest of the session.
    pub fn reset_static(&mut self) {
        self.had_error = false;
    }

    pub fn reset_runtime(&mut self) {
        self.had_runtime_error = false;
    }
}

/// Runtime errors raised by the evaluator (spec.md §7). Carries source
/// position the way the original's `RuntimeError(token, message)` does.
#[derive(Error, Debug, Clone)]
pub enum SagaError {
    #[error("{message}")]
    Runtime {
        message: String,
        line: u32,
        column: u32,
    },
}

impl SagaError {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        SagaError::Runtime {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            SagaError::Runtime { line, .. } => *line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            SagaError::Runtime { column, .. } => *column,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SagaError::Runtime { message, .. } => message,
        }
    }
}
