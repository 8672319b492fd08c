//! Compilation context types

use sable_parser::Pos;

/// Compile-time state of a function that the program does not keep.
#[derive(Debug, Clone, Default)]
pub(crate) struct FunctionInfo {
    /// The function whose body contains this one.
    pub(crate) parent: Option<usize>,
    /// Register counts at each open scope.
    pub(crate) scopes: Vec<usize>,
    /// The name a body uses to call itself, when a call can become a jump.
    pub(crate) self_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BranchKind {
    Loop,
    Switch,
    Try,
}

/// A statement that `break`, `continue` or a pending `finally` must know about.
#[derive(Debug)]
pub(crate) struct Branch {
    pub(crate) kind: BranchKind,
    pub(crate) label: Option<String>,
    pub(crate) continue_pc: usize,
    /// Pending `Jump`s to the end of the statement.
    pub(crate) breaks: Vec<usize>,
    /// Pending `JumpBack`s to `continue_pc`.
    pub(crate) continues: Vec<usize>,
    /// Set while the finally block of a try branch is being compiled.
    pub(crate) in_finally: bool,
}

impl Branch {
    pub(crate) fn new(kind: BranchKind, label: Option<String>) -> Self {
        Branch {
            kind,
            label,
            continue_pc: 0,
            breaks: Vec::new(),
            continues: Vec::new(),
            in_finally: false,
        }
    }

    pub(crate) fn accepts(&self, label: Option<&str>) -> bool {
        match (label, &self.label) {
            (None, _) => true,
            (Some(l), Some(own)) => l == own,
            (Some(_), None) => false,
        }
    }
}

/// A name used before its declaration was seen. Resolved once every file
/// is compiled.
#[derive(Debug, Clone)]
pub(crate) struct Unresolved {
    pub(crate) name: String,
    pub(crate) module: String,
    pub(crate) file: String,
    pub(crate) pos: Pos,
    pub(crate) pc: usize,
    pub(crate) func: usize,
}

/// A captured register: `register` is a position in the registers of `func`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClosureRef {
    pub(crate) func: usize,
    pub(crate) register: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_labels() {
        let b = Branch::new(BranchKind::Loop, Some("outer".to_string()));
        assert!(b.accepts(None));
        assert!(b.accepts(Some("outer")));
        assert!(!b.accepts(Some("inner")));
        assert!(!Branch::new(BranchKind::Loop, None).accepts(Some("outer")));
    }
}
