//! Error types for the VM and compiler

use sable_parser::{ParseError, Pos};
use sable_types::sync::Arc;
use sable_types::ScriptError;
use thiserror::Error;

/// Compilation error with the position that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Compiler error: {message}\n -> {}", location(.file, .pos))]
pub struct CompileError {
    pub message: String,
    pub file: String,
    pub pos: Pos,
}

impl CompileError {
    pub fn new(message: impl Into<String>, file: &str, pos: Pos) -> Self {
        Self {
            message: message.into(),
            file: file.to_string(),
            pos,
        }
    }
}

fn location(file: &str, pos: &Pos) -> String {
    if file.is_empty() {
        format!("line {}", pos)
    } else {
        format!("{}:{}", file, pos)
    }
}

/// Every error the crate reports to the host.
#[derive(Debug, Clone, Error)]
pub enum VmError {
    /// An error raised while running a script. Catchable by `try`.
    #[error("{0}")]
    Script(Arc<ScriptError>),

    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Syntax errors and module loading failures.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl VmError {
    /// A runtime error with no trace yet; the VM adds one when it is raised.
    pub fn new(message: impl Into<String>) -> Self {
        VmError::Script(Arc::new(ScriptError::new(message)))
    }

    /// The message without the stack trace.
    pub fn message(&self) -> String {
        match self {
            VmError::Script(e) => e.message.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_script(&self) -> Option<&ScriptError> {
        match self {
            VmError::Script(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScriptError> for VmError {
    fn from(err: ScriptError) -> Self {
        VmError::Script(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let e = CompileError::new("Undeclared identifier: x", "", Pos::new(3, 5));
        assert_eq!(e.to_string(), "Compiler error: Undeclared identifier: x\n -> line 3:5");

        let e = CompileError::new("boom", "/main.ts", Pos::new(1, 1));
        assert_eq!(e.to_string(), "Compiler error: boom\n -> /main.ts:1:1");
    }

    #[test]
    fn test_script_message() {
        let e = VmError::new("Attempt to divide by zero");
        assert_eq!(e.message(), "Attempt to divide by zero");
        assert!(e.as_script().is_some());
    }
}
