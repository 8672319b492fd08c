//! Array, map and enum instruction execution

use crate::bytecode::Instruction;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::Vm;
use sable_types::{Object, Value};
use std::collections::HashMap;

impl Vm {
    /// Execute collection instructions
    pub(crate) fn execute_collections(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        let Instruction { opcode, a, b, c } = instr;

        match opcode {
            OpCode::NewArray => {
                let len = b.value.max(0) as usize;
                self.set(a, Value::array(vec![Value::Null; len]))?;
                Ok(ExecutionResult::Next)
            }

            OpCode::NewMap => {
                let capacity = b.value.max(0) as usize;
                self.set(a, Value::map(HashMap::with_capacity(capacity)))?;
                Ok(ExecutionResult::Next)
            }

            OpCode::Keys => {
                let keys = self.keys(&self.get(b)?)?;
                self.set(a, Value::array(keys))?;
                Ok(ExecutionResult::Next)
            }

            OpCode::Values => {
                let values = values(&self.get(b)?)?;
                self.set(a, Value::array(values))?;
                Ok(ExecutionResult::Next)
            }

            OpCode::Length => {
                let len = match self.get(b)? {
                    Value::Array(items) => items.read().len(),
                    Value::Map(map) => map.read().len(),
                    Value::Bytes(bytes) => bytes.len(),
                    Value::String(s) => s.chars().count(),
                    other => {
                        return Err(VmError::new(format!(
                            "The value is not a collection {}",
                            other.type_name()
                        )))
                    }
                };
                self.set(a, Value::Int(len as i64))?;
                Ok(ExecutionResult::Next)
            }

            OpCode::GetEnumValue => {
                let value = self.get_property(&Value::Enum(b.index()), &Value::Int(c.value as i64))?;
                self.set(a, value)?;
                Ok(ExecutionResult::Next)
            }

            // expands the last element of an arguments array
            OpCode::Spread => {
                let Value::Array(items) = self.get(a)? else {
                    return Err(VmError::new("Spread: expected an arguments array"));
                };
                let mut items = items.write();
                match items.pop() {
                    None | Some(Value::Null) | Some(Value::Undefined) => {}
                    Some(Value::Array(last)) => {
                        let last = last.read().clone();
                        items.extend(last);
                    }
                    Some(other) => {
                        return Err(VmError::new(format!("Expected array, got {}", other.type_name())));
                    }
                }
                Ok(ExecutionResult::Next)
            }

            OpCode::DeleteProperty => {
                let object = self.get(a)?;
                let key = self.get(b)?;
                match (&object, &key) {
                    (Value::Map(map), _) => {
                        map.write().remove(&key);
                    }
                    (Value::Object(Object::Instance(inst)), Value::String(name)) => {
                        inst.write().fields.remove(name.as_ref());
                    }
                    _ => {}
                }
                Ok(ExecutionResult::Next)
            }

            _ => unreachable!("Non-collection opcode in collection handler"),
        }
    }

    /// Keys iterated by `for ... in`.
    fn keys(&self, value: &Value) -> Result<Vec<Value>, VmError> {
        match value {
            Value::Null | Value::Undefined => Ok(Vec::new()),
            Value::Array(items) => Ok((0..items.read().len() as i64).map(Value::Int).collect()),
            Value::Map(map) => Ok(map.read().keys().cloned().collect()),
            Value::Enum(e) => {
                let len = self
                    .program
                    .enums
                    .get(*e)
                    .map(|list| list.values.len())
                    .unwrap_or(0);
                Ok((0..len as i64).map(Value::Int).collect())
            }
            other => Err(VmError::new(format!("Expected a enumerable, got {}", other.type_name()))),
        }
    }
}

/// Values iterated by `for ... of`.
fn values(value: &Value) -> Result<Vec<Value>, VmError> {
    match value {
        Value::Null | Value::Undefined => Ok(Vec::new()),
        Value::Array(items) => Ok(items.read().clone()),
        Value::Bytes(bytes) => Ok(bytes.iter().map(|b| Value::Int(*b as i64)).collect()),
        Value::Map(map) => Ok(map.read().values().cloned().collect()),
        Value::String(s) => Ok(s.chars().map(Value::Rune).collect()),
        other => Err(VmError::new(format!("Expected a enumerable, got {}", other.type_name()))),
    }
}

