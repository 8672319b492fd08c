//! Execution result types

/// What the run loop does after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecutionResult {
    /// Advance the pc of the frame that executed the instruction.
    Next,
    /// The instruction already placed the pc.
    Continue,
    /// Leave the run loop: the outermost frame returned or an error
    /// was not handled.
    Exit,
}
