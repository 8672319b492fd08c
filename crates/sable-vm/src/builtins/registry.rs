//! Native function registry
//!
//! Natives are looked up by name at compile time and called by index at
//! runtime. Names follow a few conventions:
//! - `print`: a global function
//! - `Math.max`: reachable as a member of the `Math` package
//! - `->runtime.steps`: a native property, read without a call
//! - `String.prototype.trim`: a method of every string value

use crate::error::VmError;
use crate::vm::Vm;
use sable_types::Value;
use std::collections::HashMap;
use std::fmt;

/// Type signature for native functions
///
/// Receives the VM, the receiver (`this`, null for plain functions) and the
/// arguments.
pub type NativeFn = fn(&mut Vm, &Value, &[Value]) -> Result<Value, VmError>;

/// Metadata for a single native function
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    /// Expected argument count (-1 for variadic)
    pub arguments: i32,
    /// The program or the calling function must hold all of these.
    pub permissions: Vec<String>,
    pub function: NativeFn,
    /// Position in the registry, set by [`NativeRegistry::add`].
    pub index: usize,
}

impl NativeFunction {
    pub fn new(name: &str, arguments: i32, function: NativeFn) -> Self {
        Self {
            name: name.to_string(),
            arguments,
            permissions: Vec::new(),
            function,
            index: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }

    /// True for `->name` entries.
    pub fn is_property(&self) -> bool {
        self.name.starts_with("->")
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("index", &self.index)
            .finish()
    }
}

/// Registry of all native functions
///
/// Provides O(1) lookup by both name (for the compiler) and index (for the VM)
#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    functions: Vec<NativeFunction>,
    by_name: HashMap<String, usize>,
}

impl NativeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native. A second registration under the same name
    /// replaces the first and keeps its index.
    pub fn add(&mut self, mut function: NativeFunction) -> usize {
        if let Some(&index) = self.by_name.get(&function.name) {
            function.index = index;
            self.functions[index] = function;
            return index;
        }

        let index = self.functions.len();
        function.index = index;
        self.by_name.insert(function.name.clone(), index);
        self.functions.push(function);
        index
    }

    /// Get function by index (for VM runtime)
    #[inline]
    pub fn get(&self, index: usize) -> Option<&NativeFunction> {
        self.functions.get(index)
    }

    /// Get function by name (for the compiler and prototype lookups)
    pub fn find(&self, name: &str) -> Option<&NativeFunction> {
        self.by_name.get(name).map(|&i| &self.functions[i])
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NativeFunction> {
        self.functions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(_: &mut Vm, _: &Value, _: &[Value]) -> Result<Value, VmError> {
        Ok(Value::Int(1))
    }

    fn two(_: &mut Vm, _: &Value, _: &[Value]) -> Result<Value, VmError> {
        Ok(Value::Int(2))
    }

    #[test]
    fn test_replace_keeps_index() {
        let mut r = NativeRegistry::new();
        let a = r.add(NativeFunction::new("a", 0, one));
        let b = r.add(NativeFunction::new("b", 0, one));
        let a2 = r.add(NativeFunction::new("a", 1, two));

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a2, a);
        assert_eq!(r.len(), 2);
        assert_eq!(r.find("a").map(|f| f.arguments), Some(1));
    }

    #[test]
    fn test_property_names() {
        let f = NativeFunction::new("->runtime.steps", 0, one);
        assert!(f.is_property());
        assert!(!NativeFunction::new("print", -1, one).is_property());
    }
}
