//! String prototype functions
//!
//! Called as methods: `"  a ".trim()`. The receiver arrives as `this`.

use crate::error::VmError;
use crate::vm::Vm;
use sable_types::Value;

fn receiver<'a>(this: &'a Value, name: &str) -> Result<&'a str, VmError> {
    this.as_str().ok_or_else(|| {
        VmError::new(format!(
            "{}: expected a string receiver, got {}",
            name,
            this.type_name()
        ))
    })
}

pub fn vm_trim(_vm: &mut Vm, this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    Ok(Value::string(receiver(this, "trim")?.trim()))
}

pub fn vm_to_upper(_vm: &mut Vm, this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    Ok(Value::from(receiver(this, "toUpper")?.to_uppercase()))
}

pub fn vm_to_lower(_vm: &mut Vm, this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    Ok(Value::from(receiver(this, "toLower")?.to_lowercase()))
}

/// Splits on a separator; an empty separator splits into characters.
pub fn vm_split(_vm: &mut Vm, this: &Value, args: &[Value]) -> Result<Value, VmError> {
    let s = receiver(this, "split")?;
    let sep = match &args[0] {
        Value::String(sep) => sep.to_string(),
        Value::Rune(r) => r.to_string(),
        other => {
            return Err(VmError::new(format!(
                "split: expected a string separator, got {}",
                other.type_name()
            )))
        }
    };

    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        s.split(sep.as_str()).map(Value::from).collect()
    };
    Ok(Value::array(parts))
}
