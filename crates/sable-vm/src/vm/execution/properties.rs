//! Index and property access execution

use crate::bytecode::Instruction;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::Vm;
use sable_types::sync::Arc;
use sable_types::{HostObject, Object, ScriptError, Value};

impl Vm {
    /// Execute property reads and writes
    pub(crate) fn execute_properties(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        let Instruction { opcode, a, b, c } = instr;

        match opcode {
            OpCode::GetIndexOrKey | OpCode::GetOptChain => {
                let object = self.get(b)?;
                let key = self.get(c)?;

                if object.is_nil() {
                    if opcode == OpCode::GetOptChain {
                        return self.short_circuit();
                    }
                    let message = match key {
                        Value::Int(_) => format!("Cant read index {} of {}", key, object),
                        _ => format!("Cant read property {} of {}", key, object),
                    };
                    return Err(VmError::new(message));
                }

                let value = self.get_property(&object, &key)?;
                self.set(a, value)?;
                Ok(ExecutionResult::Next)
            }

            OpCode::SetIndexOrKey => {
                let object = self.get(a)?;
                let key = self.get(b)?;
                let value = self.get(c)?;
                self.add_allocations(value.size())?;
                self.set_property(&object, &key, value)?;
                Ok(ExecutionResult::Next)
            }

            _ => unreachable!("Non-property opcode in property handler"),
        }
    }

    /// `object[key]` and `object.key`. Missing keys read as undefined.
    pub(crate) fn get_property(&self, object: &Value, key: &Value) -> Result<Value, VmError> {
        if let Value::Map(map) = object {
            let map = map.read();
            if let Some(v) = map.get(key) {
                return Ok(v.clone());
            }
            return Ok(match key.as_str() {
                Some("length") => Value::Int(map.len() as i64),
                _ => Value::Undefined,
            });
        }

        match key {
            Value::Int(i) => self.get_index(object, *i),
            Value::String(name) => self.get_named(object, name),
            Value::Float(_) | Value::Null | Value::Undefined => Err(VmError::new(format!(
                "Invalid index {} for {}",
                key.type_name(),
                object.type_name()
            ))),
            other => Err(VmError::new(format!("Invalid index {}", other.type_name()))),
        }
    }

    fn get_index(&self, object: &Value, i: i64) -> Result<Value, VmError> {
        match object {
            Value::Array(items) => {
                let items = items.read();
                if i < 0 {
                    return Err(VmError::new("Index out of range in string"));
                }
                items
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| VmError::new("Index out of range"))
            }
            Value::String(s) => {
                let c = usize::try_from(i).ok().and_then(|i| s.chars().nth(i));
                c.map(Value::Rune).ok_or_else(|| VmError::new("Index out of range"))
            }
            Value::Bytes(b) => usize::try_from(i)
                .ok()
                .and_then(|i| b.get(i))
                .map(|b| Value::Int(*b as i64))
                .ok_or_else(|| VmError::new("Index out of range")),
            Value::Enum(e) => {
                let list = self.enum_list(*e)?;
                let value = usize::try_from(i).ok().and_then(|i| list.values.get(i));
                match value {
                    Some(v) => self.get(crate::bytecode::Address::constant(v.k_index)),
                    None => Err(VmError::new(format!(
                        "invalid enum index: {} {} [{}]",
                        list.name,
                        i,
                        list.values.len()
                    ))),
                }
            }
            other => Err(VmError::new(format!(
                "The value must be Array or Indexer: {}",
                other.type_name()
            ))),
        }
    }

    fn get_named(&self, object: &Value, name: &str) -> Result<Value, VmError> {
        match object {
            Value::Enum(e) => {
                let list = self.enum_list(*e)?;
                match list.value_by_name(name) {
                    Some((_, v)) => self.get(crate::bytecode::Address::constant(v.k_index)),
                    None => Err(VmError::new(format!("invalid enum key: {}.{}", list.name, name))),
                }
            }
            Value::Array(items) => match name {
                "length" => Ok(Value::Int(items.read().len() as i64)),
                _ => Ok(self.prototype("Array", object, name)),
            },
            Value::String(s) => match name {
                "length" => Ok(Value::Int(s.len() as i64)),
                "runeCount" => Ok(Value::Int(s.chars().count() as i64)),
                _ => Ok(self.prototype("String", object, name)),
            },
            Value::Bytes(b) => match name {
                "length" => Ok(Value::Int(b.len() as i64)),
                _ => Ok(self.prototype("Bytes", object, name)),
            },
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => Err(VmError::new(format!(
                "Can't read '{}' from {} ({})",
                name,
                object,
                object.type_name()
            ))),
            Value::Object(Object::Instance(inst)) => {
                let (class, field) = {
                    let inst = inst.read();
                    (inst.class, inst.fields.get(name).cloned())
                };
                let decl = self
                    .program
                    .classes
                    .get(class)
                    .ok_or_else(|| VmError::new(format!("Invalid class: {}", class)))?;

                if let Some(value) = field {
                    if decl.field(name).is_some_and(|f| !f.exported) && !self.is_self(class) {
                        return Err(VmError::new(format!("Attempted to access a private field: {}", name)));
                    }
                    return Ok(value);
                }

                let method = decl
                    .functions
                    .iter()
                    .filter_map(|&i| self.program.functions.get(i))
                    .find(|f| f.name == name);
                match method {
                    Some(f) => {
                        if !f.exported && !self.is_self(class) {
                            return Err(VmError::new(format!("Attempted to access a private method: {}", name)));
                        }
                        Ok(Value::Object(Object::Method {
                            this: Box::new(object.clone()),
                            func: f.index,
                        }))
                    }
                    None => Ok(Value::Undefined),
                }
            }
            Value::Object(Object::Error(e)) => Ok(error_field(e, name)),
            Value::Object(Object::Host(host)) => Ok(host_field(host, name)),
            _ => Ok(Value::Undefined),
        }
    }

    /// `object[key] = value`
    pub(crate) fn set_property(&self, object: &Value, key: &Value, value: Value) -> Result<(), VmError> {
        match (object, key) {
            (Value::Map(map), _) => {
                map.write().insert(key.clone(), value);
                Ok(())
            }
            (Value::Array(items), Value::Int(i)) => {
                let mut items = items.write();
                let len = items.len();
                match usize::try_from(*i).ok().and_then(|i| items.get_mut(i)) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(VmError::new(format!("Index {} is out of range. Length is {}", i, len))),
                }
            }
            (Value::Object(Object::Instance(inst)), Value::String(name)) => {
                let class = inst.read().class;
                let private = self
                    .program
                    .classes
                    .get(class)
                    .and_then(|c| c.field(name))
                    .is_some_and(|f| !f.exported);
                if private && !self.is_self(class) {
                    return Err(VmError::new(format!("Attempted to access a private field: {}", name)));
                }
                inst.write().fields.insert(name.to_string(), value);
                Ok(())
            }
            (Value::Object(Object::Host(host)), Value::String(name)) => Ok(host.set_field(name, value)?),
            (Value::Null | Value::Undefined, _) => Err(VmError::new(format!("Can't set {} of null", key))),
            (_, Value::Int(_)) => Err(VmError::new(format!("Can't set {} by index", object.type_name()))),
            (_, Value::String(_)) => Err(VmError::new(format!(
                "Readonly field or nonexistent field: {}",
                object.type_name()
            ))),
            (_, Value::Float(_) | Value::Null | Value::Undefined) => Err(VmError::new(format!(
                "Invalid index {} for {}",
                key.type_name(),
                object.type_name()
            ))),
            _ => Err(VmError::new(format!("Invalid index {}", key.type_name()))),
        }
    }

    /// Code running inside a method or a closure of the class.
    fn is_self(&self, class: usize) -> bool {
        self.current_function()
            .map(|f| f.class == Some(class) || f.wrap_class == Some(class))
            .unwrap_or(false)
    }

    fn enum_list(&self, index: usize) -> Result<&crate::bytecode::EnumList, VmError> {
        self.program
            .enums
            .get(index)
            .ok_or_else(|| VmError::new(format!("Invalid enum: {}", index)))
    }

    /// A native method bound to `object`, or undefined.
    fn prototype(&self, kind: &str, object: &Value, name: &str) -> Value {
        let found = self
            .program
            .natives
            .find(&format!("{}.prototype.{}", kind, name))
            .or_else(|| {
                // bytes share the array methods
                (kind == "Bytes")
                    .then(|| self.program.natives.find(&format!("Array.prototype.{}", name)))
                    .flatten()
            });

        match found {
            Some(native) => Value::Object(Object::NativePrototype {
                this: Box::new(object.clone()),
                func: native.index,
            }),
            None => Value::Undefined,
        }
    }
}

fn error_field(err: &ScriptError, name: &str) -> Value {
    match name {
        "message" => Value::from(err.message.as_str()),
        "kind" => err.kind.as_deref().map(Value::from).unwrap_or(Value::Null),
        "stackTrace" => Value::from(err.stack_trace()),
        _ => Value::Undefined,
    }
}

fn host_field(host: &Arc<dyn HostObject>, name: &str) -> Value {
    if host.has_method(name) {
        return Value::Object(Object::HostMethod {
            host: Arc::clone(host),
            name: Arc::from(name),
        });
    }
    host.get_field(name).unwrap_or(Value::Undefined)
}
