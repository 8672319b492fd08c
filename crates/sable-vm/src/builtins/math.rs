//! Math package: max, min

use crate::error::VmError;
use crate::vm::Vm;
use sable_types::Value;

fn fold(name: &str, args: &[Value], pick: fn(f64, f64) -> bool) -> Result<Value, VmError> {
    let mut best: Option<&Value> = None;
    let mut all_ints = true;

    for v in args {
        let x = match v {
            Value::Int(_) => v.to_float(),
            Value::Float(_) => {
                all_ints = false;
                v.to_float()
            }
            other => {
                return Err(VmError::new(format!(
                    "{}: expected numbers, got {}",
                    name,
                    other.type_name()
                )))
            }
        };
        let replace = match (best.and_then(|b| b.to_float()), x) {
            (None, _) => true,
            (Some(b), Some(x)) => pick(x, b),
            _ => false,
        };
        if replace {
            best = Some(v);
        }
    }

    match best {
        None => Err(VmError::new(format!("{}: expected at least one argument", name))),
        Some(v) if all_ints => Ok(v.clone()),
        Some(v) => Ok(Value::Float(v.to_float().unwrap_or_default())),
    }
}

pub fn vm_max(_vm: &mut Vm, _this: &Value, args: &[Value]) -> Result<Value, VmError> {
    fold("max", args, |x, best| x > best)
}

pub fn vm_min(_vm: &mut Vm, _this: &Value, args: &[Value]) -> Result<Value, VmError> {
    fold("min", args, |x, best| x < best)
}
