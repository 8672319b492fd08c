//! Output built-in functions: print, println
//!
//! Output goes to the VM's writer (stdout unless the host replaced it).

use crate::error::VmError;
use crate::vm::Vm;
use sable_types::Value;

fn join(args: &[Value]) -> String {
    args.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print values separated by spaces
pub fn vm_print(vm: &mut Vm, _this: &Value, args: &[Value]) -> Result<Value, VmError> {
    vm.write_output(&join(args))?;
    Ok(Value::Null)
}

/// Print values separated by spaces, followed by a newline
pub fn vm_println(vm: &mut Vm, _this: &Value, args: &[Value]) -> Result<Value, VmError> {
    let mut line = join(args);
    line.push('\n');
    vm.write_output(&line)?;
    Ok(Value::Null)
}
