//! Array prototype functions: push, pop, join, indexOf

use crate::error::VmError;
use crate::vm::Vm;
use sable_types::sync::Shared;
use sable_types::Value;

fn receiver<'a>(this: &'a Value, name: &str) -> Result<&'a Shared<Vec<Value>>, VmError> {
    match this {
        Value::Array(a) => Ok(a),
        other => Err(VmError::new(format!(
            "{}: expected an array receiver, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Appends every argument to the array.
pub fn vm_push(vm: &mut Vm, this: &Value, args: &[Value]) -> Result<Value, VmError> {
    let items = receiver(this, "push")?;
    vm.add_allocations(args.iter().map(|v| v.size()).sum())?;
    items.write().extend_from_slice(args);
    Ok(Value::Null)
}

/// Removes and returns the last element, or null when empty.
pub fn vm_pop(_vm: &mut Vm, this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    let items = receiver(this, "pop")?;
    let last = items.write().pop();
    Ok(last.unwrap_or_default())
}

pub fn vm_join(_vm: &mut Vm, this: &Value, args: &[Value]) -> Result<Value, VmError> {
    let items = receiver(this, "join")?;
    let sep = match args.first() {
        None | Some(Value::Null) | Some(Value::Undefined) => String::new(),
        Some(v) => v.to_string(),
    };
    let joined = items
        .read()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(&sep);
    Ok(Value::from(joined))
}

/// Position of the first loosely equal element, or -1.
pub fn vm_index_of(_vm: &mut Vm, this: &Value, args: &[Value]) -> Result<Value, VmError> {
    let items = receiver(this, "indexOf")?;
    let index = items
        .read()
        .iter()
        .position(|v| v.equals(&args[0]))
        .map(|i| i as i64)
        .unwrap_or(-1);
    Ok(Value::Int(index))
}
