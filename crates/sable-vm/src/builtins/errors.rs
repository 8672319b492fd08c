//! Error values: errors.newError, errors.is

use crate::error::VmError;
use crate::vm::Vm;
use sable_types::{ScriptError, Value};

/// `errors.newError(message, kind?)`: the trace is captured here, so a
/// later `throw` keeps it.
pub fn vm_new_error(vm: &mut Vm, _this: &Value, args: &[Value]) -> Result<Value, VmError> {
    let message = match args.first() {
        Some(v) => v.to_string(),
        None => return Err(VmError::new("newError: expected a message")),
    };

    let mut err = ScriptError::new(message).with_trace(vm.stack_trace());
    match args.get(1) {
        None | Some(Value::Null) | Some(Value::Undefined) => {}
        Some(kind) => err = err.with_kind(kind.to_string()),
    }
    Ok(Value::error(err))
}

/// `errors.is(err, kind)`
pub fn vm_is(_vm: &mut Vm, _this: &Value, args: &[Value]) -> Result<Value, VmError> {
    let kind = args[1].to_string();
    Ok(Value::Bool(
        args[0].as_error().map(|e| e.is(&kind)).unwrap_or(false),
    ))
}
