// ABOUTME: Non-local exit signal threaded through statement execution (Design Notes §9)

use crate::value::Value;

/// `break`/`continue`/`return` as a typed result instead of a thrown
/// exception, per Design Notes §9: "have `execute_statement` return a
/// small tagged result {Normal | Break | Continue | Return(value)} that
/// loops/functions inspect and propagate."
#[derive(Debug, Clone)]
pub enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

impl ControlFlow {
    pub fn is_normal(&self) -> bool {
        matches!(self, ControlFlow::Normal)
    }
}
