//! Opaque runtime objects: closures, bound methods, class instances, errors
//! and host-provided objects.

use crate::error::ScriptError;
use crate::sync::{Arc, Shared};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// A reference into the register storage of the frame that defined a
/// captured variable. Reads and writes go to the live storage, so every
/// closure holding the cell observes the same variable.
#[derive(Clone)]
pub struct ClosureCell {
    pub storage: Shared<Vec<Value>>,
    pub index: usize,
}

impl ClosureCell {
    pub fn new(storage: Shared<Vec<Value>>, index: usize) -> Self {
        Self { storage, index }
    }

    pub fn get(&self) -> Value {
        self.storage
            .read()
            .get(self.index)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&self, value: Value) {
        let mut regs = self.storage.write();
        if self.index >= regs.len() {
            regs.resize(self.index + 1, Value::Null);
        }
        regs[self.index] = value;
    }
}

impl fmt::Debug for ClosureCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClosureCell({:p}#{})", Arc::as_ptr(&self.storage), self.index)
    }
}

/// A function value together with the cells it captured.
#[derive(Clone, Debug)]
pub struct Closure {
    pub func: usize,
    pub cells: Arc<[ClosureCell]>,
}

/// A class instance.
#[derive(Clone, Debug, Default)]
pub struct Instance {
    pub class: usize,
    pub fields: HashMap<String, Value>,
}

/// Objects implemented by the embedding host.
///
/// Every method has a default so a host type only implements what it
/// supports. `compare` returns -1, 0 or 1, or -2 when the values cannot be
/// ordered.
pub trait HostObject: Send + Sync {
    fn type_name(&self) -> &str;

    fn get_field(&self, _name: &str) -> Option<Value> {
        None
    }

    fn set_field(&self, name: &str, _value: Value) -> Result<(), ScriptError> {
        Err(ScriptError::new(format!(
            "Can't set {} of {}",
            name,
            self.type_name()
        )))
    }

    fn has_method(&self, _name: &str) -> bool {
        false
    }

    fn call_method(&self, name: &str, _args: &[Value]) -> Result<Value, ScriptError> {
        Err(ScriptError::new(format!(
            "{} has no method {}",
            self.type_name(),
            name
        )))
    }

    fn compare(&self, _other: &Value) -> i32 {
        -2
    }

    fn equals(&self, _other: &Value) -> bool {
        false
    }

    fn export(&self, _depth: usize) -> serde_json::Value {
        serde_json::Value::String(format!("[{}]", self.type_name()))
    }

    /// Releases resources held by the object. Called by finalizers.
    fn close(&self) -> Result<(), ScriptError> {
        Ok(())
    }
}

#[derive(Clone)]
pub enum Object {
    Closure(Closure),
    /// A class method bound to its receiver.
    Method { this: Box<Value>, func: usize },
    Instance(Shared<Instance>),
    Error(Arc<ScriptError>),
    /// A native prototype function (`String.prototype.trim`) bound to its receiver.
    NativePrototype { this: Box<Value>, func: usize },
    HostMethod { host: Arc<dyn HostObject>, name: Arc<str> },
    Host(Arc<dyn HostObject>),
}

impl Object {
    pub fn type_name(&self) -> &str {
        match self {
            Object::Closure(_) => "function",
            Object::Method { .. } => "method",
            Object::Instance(_) => "object",
            Object::Error(_) => "error",
            Object::NativePrototype { .. } | Object::HostMethod { .. } => "native method",
            Object::Host(h) => h.type_name(),
        }
    }

    /// Identity comparison.
    pub fn same(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Closure(a), Object::Closure(b)) => {
                a.func == b.func && std::ptr::eq(a.cells.as_ptr(), b.cells.as_ptr())
            }
            (Object::Method { this: t1, func: f1 }, Object::Method { this: t2, func: f2 })
            | (
                Object::NativePrototype { this: t1, func: f1 },
                Object::NativePrototype { this: t2, func: f2 },
            ) => f1 == f2 && t1.strict_equals(t2),
            (Object::Instance(a), Object::Instance(b)) => Arc::ptr_eq(a, b),
            (Object::Error(a), Object::Error(b)) => Arc::ptr_eq(a, b),
            (
                Object::HostMethod { host: h1, name: n1 },
                Object::HostMethod { host: h2, name: n2 },
            ) => Arc::ptr_eq(h1, h2) && n1 == n2,
            (Object::Host(a), Object::Host(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address used to hash objects by identity.
    pub(crate) fn identity(&self) -> usize {
        match self {
            Object::Closure(c) => c.cells.as_ptr() as *const u8 as usize ^ c.func,
            Object::Method { func, .. } | Object::NativePrototype { func, .. } => *func,
            Object::Instance(i) => Arc::as_ptr(i) as *const u8 as usize,
            Object::Error(e) => Arc::as_ptr(e) as *const u8 as usize,
            Object::HostMethod { host, .. } | Object::Host(host) => {
                Arc::as_ptr(host) as *const u8 as usize
            }
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Closure(c) => write!(f, "Closure({})", c.func),
            Object::Method { func, .. } => write!(f, "Method({})", func),
            Object::Instance(i) => {
                let inst = i.read();
                let mut names: Vec<&String> = inst.fields.keys().collect();
                names.sort();
                write!(f, "Instance({:?})", names)
            }
            Object::Error(e) => write!(f, "Error({:?})", e.message),
            Object::NativePrototype { func, .. } => write!(f, "NativePrototype({})", func),
            Object::HostMethod { host, name } => write!(f, "{}.{}", host.type_name(), name),
            Object::Host(h) => write!(f, "[{}]", h.type_name()),
        }
    }
}
