//! Script-level error values.

use std::fmt;

/// One line of a script stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub function: String,
    pub file: Option<String>,
    pub line: u32,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file, self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// An error raised by a script (`throw`) or by the runtime.
///
/// Errors are immutable once created: the trace is captured when the error is
/// first raised, and rethrowing the same value keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    pub message: String,
    pub kind: Option<String>,
    pub trace: Vec<TraceLine>,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            trace: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_trace(mut self, trace: Vec<TraceLine>) -> Self {
        self.trace = trace;
        self
    }

    /// Reports whether the error carries the given kind tag.
    pub fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// The stack trace rendered one frame per line.
    pub fn stack_trace(&self) -> String {
        self.trace
            .iter()
            .map(|l| format!(" -> {}", l))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.trace.is_empty() {
            write!(f, "\n{}", self.stack_trace())?;
        }
        Ok(())
    }
}

impl std::error::Error for ScriptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_line_format() {
        let l = TraceLine {
            function: "main".into(),
            file: None,
            line: 3,
        };
        assert_eq!(l.to_string(), "line 3");

        let l = TraceLine {
            function: "main".into(),
            file: Some("main.ts".into()),
            line: 7,
        };
        assert_eq!(l.to_string(), "main.ts:7");
    }

    #[test]
    fn test_error_kind() {
        let e = ScriptError::new("boom").with_kind("io");
        assert!(e.is("io"));
        assert!(!e.is("net"));
        assert_eq!(e.to_string(), "boom");
    }
}
