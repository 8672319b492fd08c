//! Runtime introspection: runtime.steps

use crate::error::VmError;
use crate::vm::Vm;
use sable_types::Value;

/// `runtime.steps`: instructions executed so far.
pub fn vm_steps(vm: &mut Vm, _this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    Ok(Value::Int(vm.steps() as i64))
}
