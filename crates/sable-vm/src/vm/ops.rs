//! Value operation helpers
//!
//! The coercion table of the arithmetic and comparison instructions. Null
//! and undefined act as the identity of `+`, `-` and `*`; runes mix with
//! ints; a one character string mixes with runes.

use crate::error::VmError;
use sable_types::Value;

/// Implementation of value operations for the VM
pub(crate) struct ValueOperations;

fn invalid(left: &Value, right: &Value) -> VmError {
    VmError::new(format!(
        "Invalid operation on {} and {}",
        left.value_type(),
        right.value_type()
    ))
}

fn invalid_unary(value: &Value) -> VmError {
    VmError::new(format!("Invalid operation on {}", value.value_type()))
}

fn divide_by_zero() -> VmError {
    VmError::new("Attempt to divide by zero")
}

fn rune(n: i64) -> Result<Value, VmError> {
    u32::try_from(n)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Rune)
        .ok_or_else(|| VmError::new(format!("Invalid rune: {}", n)))
}

fn rune_code(v: &Value) -> i64 {
    v.to_int().unwrap_or_default()
}

/// The rune of a one character string.
fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn concat(left: &Value, right: &Value) -> Value {
    Value::from(format!("{}{}", left, right))
}

impl ValueOperations {
    pub(crate) fn add_values(left: &Value, right: &Value) -> Result<Value, VmError> {
        use Value::*;
        match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a.wrapping_add(*b))),
            (Int(_) | Float(_), Float(_)) | (Float(_), Int(_)) => {
                Ok(Float(left.to_float().unwrap_or_default() + right.to_float().unwrap_or_default()))
            }
            (Int(_) | Float(_) | Rune(_), Rune(_)) | (Rune(_), Int(_)) => {
                rune(rune_code(left) + rune_code(right))
            }
            (Int(_) | Float(_) | Rune(_) | Bool(_) | String(_), String(_))
            | (String(_), Int(_) | Float(_) | Bool(_) | Rune(_)) => Ok(concat(left, right)),
            (Int(_) | Float(_) | Rune(_) | String(_), Null | Undefined) => Ok(left.clone()),
            (Null | Undefined, String(_) | Int(_) | Float(_) | Rune(_)) => Ok(right.clone()),
            _ => Err(invalid(left, right)),
        }
    }

    pub(crate) fn sub_values(left: &Value, right: &Value) -> Result<Value, VmError> {
        use Value::*;
        match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a.wrapping_sub(*b))),
            (Int(_) | Float(_), Float(_)) | (Float(_), Int(_)) => {
                Ok(Float(left.to_float().unwrap_or_default() - right.to_float().unwrap_or_default()))
            }
            (Rune(a), Rune(_) | Int(_)) => rune(*a as i64 - rune_code(right)),
            (Rune(a), String(s)) => match single_char(s) {
                Some(b) => rune(*a as i64 - b as i64),
                None => Err(invalid(left, right)),
            },
            (String(s), Rune(_) | Int(_) | String(_)) => {
                let a = single_char(s).ok_or_else(|| invalid(left, right))?;
                let b = match right {
                    String(r) => single_char(r).ok_or_else(|| invalid(left, right))? as i64,
                    other => rune_code(other),
                };
                rune(a as i64 - b)
            }
            (Int(_) | Float(_) | Rune(_) | String(_), Null | Undefined) => Ok(left.clone()),
            (Null | Undefined, String(_) | Int(_) | Float(_) | Rune(_)) => Ok(right.clone()),
            _ => Err(invalid(left, right)),
        }
    }

    pub(crate) fn mul_values(left: &Value, right: &Value) -> Result<Value, VmError> {
        use Value::*;
        match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a.wrapping_mul(*b))),
            (Int(_) | Float(_), Float(_)) | (Float(_), Int(_)) => {
                Ok(Float(left.to_float().unwrap_or_default() * right.to_float().unwrap_or_default()))
            }
            (Int(_), Rune(_)) | (Rune(_), Rune(_) | Int(_)) => {
                rune(rune_code(left).wrapping_mul(rune_code(right)))
            }
            (Int(_) | Float(_) | Rune(_), Null | Undefined) => Ok(left.clone()),
            (Null | Undefined, Int(_) | Float(_) | Rune(_)) => Ok(right.clone()),
            _ => Err(invalid(left, right)),
        }
    }

    /// Numbers always divide as floats. Runes divide as integers.
    pub(crate) fn div_values(left: &Value, right: &Value) -> Result<Value, VmError> {
        use Value::*;
        if matches!(left, Rune(_)) || matches!(right, Rune(_)) {
            if !matches!(left, Int(_) | Rune(_) | Null | Undefined) || !matches!(right, Int(_) | Rune(_)) {
                return Err(invalid(left, right));
            }
            let divisor = rune_code(right);
            if divisor == 0 {
                return Err(divide_by_zero());
            }
            return rune(rune_code(left) / divisor);
        }

        let numeric = |v: &Value| matches!(v, Int(_) | Float(_) | Null | Undefined);
        if !numeric(left) || !numeric(right) {
            return Err(invalid(left, right));
        }

        let divisor = right.to_float().unwrap_or_default();
        if divisor == 0.0 {
            return Err(divide_by_zero());
        }
        Ok(Float(left.to_float().unwrap_or_default() / divisor))
    }

    pub(crate) fn mod_values(left: &Value, right: &Value) -> Result<Value, VmError> {
        use Value::*;
        match (left, right) {
            (Int(a), Int(_) | Null | Undefined) => {
                let b = right.to_int().unwrap_or_default();
                if b == 0 {
                    return Err(divide_by_zero());
                }
                Ok(Int(a.wrapping_rem(b)))
            }
            (Rune(a), Rune(_) | Int(_) | Null | Undefined) => {
                let b = rune_code(right);
                if b == 0 {
                    return Err(divide_by_zero());
                }
                rune(*a as i64 % b)
            }
            (Null | Undefined, _) => match right.to_float() {
                Some(b) if b != 0.0 => Ok(Int(0)),
                Some(_) => Err(divide_by_zero()),
                None => Err(invalid(left, right)),
            },
            _ => Err(invalid(left, right)),
        }
    }

    pub(crate) fn pow_values(left: &Value, right: &Value) -> Result<Value, VmError> {
        match (left, right) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let base = left.to_float().unwrap_or_default();
                let exp = right.to_float().unwrap_or_default();
                Ok(Value::Float(base.powf(exp)))
            }
            _ => Err(invalid(left, right)),
        }
    }

    /// `|`, `&`, `^`, `<<` and `>>` on ints.
    pub(crate) fn bitwise(left: &Value, right: &Value, op: fn(i64, i64) -> i64) -> Result<Value, VmError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(op(*a, *b))),
            _ => Err(invalid(left, right)),
        }
    }

    pub(crate) fn shl(a: i64, b: i64) -> i64 {
        u32::try_from(b)
            .ok()
            .and_then(|b| a.checked_shl(b))
            .filter(|_| b < 64)
            .unwrap_or(0)
    }

    pub(crate) fn shr(a: i64, b: i64) -> i64 {
        match u32::try_from(b) {
            Ok(b) if b < 64 => a >> b,
            _ if a < 0 => -1,
            _ => 0,
        }
    }

    pub(crate) fn neg_value(value: &Value) -> Result<Value, VmError> {
        match value {
            Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(invalid_unary(other)),
        }
    }

    pub(crate) fn bit_not_value(value: &Value) -> Result<Value, VmError> {
        match value {
            Value::Int(i) => Ok(Value::Int(!i)),
            other => Err(invalid_unary(other)),
        }
    }

    /// `++` and `--`
    pub(crate) fn step_value(value: &Value, delta: i64) -> Result<Value, VmError> {
        match value {
            Value::Int(i) => Ok(Value::Int(i.wrapping_add(delta))),
            Value::Float(f) => Ok(Value::Float(f + delta as f64)),
            other => Err(invalid_unary(other)),
        }
    }

    pub(crate) fn lt_values(left: &Value, right: &Value) -> Result<bool, VmError> {
        Self::compare(left, right, false)
    }

    pub(crate) fn le_values(left: &Value, right: &Value) -> Result<bool, VmError> {
        Self::compare(left, right, true)
    }

    fn compare(left: &Value, right: &Value, or_equal: bool) -> Result<bool, VmError> {
        use std::cmp::Ordering;
        use Value::*;

        let ordering = match (left, right) {
            (Int(a), Int(b)) => a.cmp(b),
            (Int(_) | Float(_), Int(_) | Float(_)) => {
                let a = left.to_float().unwrap_or_default();
                let b = right.to_float().unwrap_or_default();
                a.partial_cmp(&b).ok_or_else(|| invalid(left, right))?
            }
            (Int(_) | Float(_), Null) | (Null, Int(_) | Float(_)) => {
                let a = left.to_float().unwrap_or_default();
                let b = right.to_float().unwrap_or_default();
                a.partial_cmp(&b).ok_or_else(|| invalid(left, right))?
            }
            (Rune(_), Rune(_) | Int(_)) => rune_code(left).cmp(&rune_code(right)),
            (Rune(a), String(s)) => {
                let b = single_char(s).ok_or_else(|| invalid(left, right))?;
                a.cmp(&b)
            }
            (String(s), Rune(b)) => {
                let a = single_char(s).ok_or_else(|| invalid(left, right))?;
                a.cmp(b)
            }
            (String(a), String(b)) => a.cmp(b),
            (String(_), Null) | (Null, String(_) | Rune(_)) => return Ok(false),
            (Object(sable_types::Object::Host(h)), Object(_)) => match h.compare(right) {
                -2 => return Err(invalid(left, right)),
                c => c.cmp(&0),
            },
            _ => return Err(invalid(left, right)),
        };

        Ok(match ordering {
            Ordering::Less => true,
            Ordering::Equal => or_equal,
            Ordering::Greater => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_coercions() {
        let add = ValueOperations::add_values;
        assert_eq!(add(&Value::from("1"), &Value::Null).unwrap(), Value::from("1"));
        assert_eq!(add(&Value::Null, &Value::Int(3)).unwrap(), Value::Int(3));
        assert_eq!(add(&Value::Int(1), &Value::from("a")).unwrap(), Value::from("1a"));
        assert_eq!(add(&Value::Rune('a'), &Value::Int(1)).unwrap(), Value::Rune('b'));
        assert_eq!(add(&Value::Bool(true), &Value::from("!")).unwrap(), Value::from("true!"));
        assert!(add(&Value::Bool(true), &Value::Int(1)).is_err());
    }

    #[test]
    fn test_division() {
        let div = ValueOperations::div_values;
        assert_eq!(div(&Value::Int(7), &Value::Int(2)).unwrap(), Value::Float(3.5));
        let err = div(&Value::Int(1), &Value::Int(0)).unwrap_err();
        assert_eq!(err.message(), "Attempt to divide by zero");
        assert!(ValueOperations::mod_values(&Value::Float(1.0), &Value::Int(1)).is_err());
        assert_eq!(
            ValueOperations::mod_values(&Value::Int(-7), &Value::Int(3)).unwrap(),
            Value::Int(-1)
        );
    }

    #[test]
    fn test_rune_and_string_ordering() {
        let lt = ValueOperations::lt_values;
        assert!(lt(&Value::Rune('a'), &Value::from("b")).unwrap());
        assert!(lt(&Value::from("abc"), &Value::from("abd")).unwrap());
        assert!(lt(&Value::Rune('a'), &Value::from("bc")).is_err());
        assert!(!lt(&Value::Null, &Value::from("x")).unwrap());
        assert!(ValueOperations::le_values(&Value::Int(2), &Value::Float(2.0)).unwrap());
    }

    #[test]
    fn test_shifts() {
        assert_eq!(ValueOperations::shl(1, 3), 8);
        assert_eq!(ValueOperations::shl(1, 64), 0);
        assert_eq!(ValueOperations::shr(-8, 1), -4);
        assert_eq!(ValueOperations::shr(-8, 70), -1);
    }

    proptest! {
        #[test]
        fn int_arithmetic_matches_host(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let (x, y) = (Value::Int(a), Value::Int(b));
            prop_assert_eq!(ValueOperations::add_values(&x, &y).unwrap(), Value::Int(a + b));
            prop_assert_eq!(ValueOperations::sub_values(&x, &y).unwrap(), Value::Int(a - b));
            prop_assert_eq!(ValueOperations::mul_values(&x, &y).unwrap(), Value::Int(a * b));
            prop_assert_eq!(ValueOperations::lt_values(&x, &y).unwrap(), a < b);
            if b != 0 {
                prop_assert_eq!(ValueOperations::mod_values(&x, &y).unwrap(), Value::Int(a % b));
            }
        }

        #[test]
        fn mixed_arithmetic_is_float(a in -1000i64..1000, b in -1000.0f64..1000.0) {
            let r = ValueOperations::add_values(&Value::Int(a), &Value::Float(b)).unwrap();
            prop_assert_eq!(r, Value::Float(a as f64 + b));
        }
    }
}
