use super::helpers::{execute, initialized_vm, run_error};
use sable_types::Value;

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(execute("return 1 + 2 * 3").unwrap(), Value::Int(7));
    assert_eq!(execute("return (1 + 2) * 3").unwrap(), Value::Int(9));
    assert_eq!(execute("return 10 % 3").unwrap(), Value::Int(1));
    assert_eq!(execute("return -2 + 5").unwrap(), Value::Int(3));
}

#[test]
fn test_division_is_float() {
    assert_eq!(execute("return 7 / 2").unwrap(), Value::Float(3.5));
    assert_eq!(execute("return 2 ** 10").unwrap(), Value::Float(1024.0));
}

#[test]
fn test_divide_by_zero() {
    assert_eq!(run_error("let a = 0; return 1 / a"), "Attempt to divide by zero");
}

#[test]
fn test_string_concatenation() {
    assert_eq!(execute(r#"return "a" + 1 + true"#).unwrap(), Value::from("a1true"));
    assert_eq!(execute(r#"let s = "x"; s += "y"; return s"#).unwrap(), Value::from("xy"));
}

#[test]
fn test_invalid_operation() {
    let err = run_error("let a = [1]; return a - 1");
    assert!(err.starts_with("Invalid operation on array and int"), "{}", err);
}

#[test]
fn test_comparisons() {
    assert_eq!(execute("return 1 < 2 && 2 <= 2").unwrap(), Value::Bool(true));
    assert_eq!(execute("return 3 > 4").unwrap(), Value::Bool(false));
    assert_eq!(execute("return 1 == 1.0").unwrap(), Value::Bool(true));
    assert_eq!(execute("return 1 === 1.0").unwrap(), Value::Bool(false));
    assert_eq!(execute(r#"return "a" < "b""#).unwrap(), Value::Bool(true));
}

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(execute("return null || 5").unwrap(), Value::Int(5));
    assert_eq!(execute("return 0 && 5").unwrap(), Value::Int(0));
    assert_eq!(execute("return null ?? 2").unwrap(), Value::Int(2));
    assert_eq!(execute("return 0 ?? 2").unwrap(), Value::Int(0));
    assert_eq!(execute("return !0").unwrap(), Value::Bool(true));
}

#[test]
fn test_bitwise() {
    assert_eq!(execute("return 6 & 3").unwrap(), Value::Int(2));
    assert_eq!(execute("return 6 | 3").unwrap(), Value::Int(7));
    assert_eq!(execute("return 6 ^ 3").unwrap(), Value::Int(5));
    assert_eq!(execute("return 1 << 4").unwrap(), Value::Int(16));
    assert_eq!(execute("return -16 >> 2").unwrap(), Value::Int(-4));
    assert_eq!(execute("return ~0").unwrap(), Value::Int(-1));
}

#[test]
fn test_ternary() {
    assert_eq!(execute("let a = 3; return a > 2 ? \"big\" : \"small\"").unwrap(), Value::from("big"));
}

#[test]
fn test_arrays_and_maps() {
    assert_eq!(execute("let a = [1, 2, 3]; a[1] = 5; return a[1] + a.length").unwrap(), Value::Int(8));
    assert_eq!(execute("let m = {a: 1, \"b\": 2}; m.c = 3; return m.a + m[\"b\"] + m.c").unwrap(), Value::Int(6));
    assert_eq!(execute("let m = {}; return m.missing").unwrap(), Value::Undefined);
    assert_eq!(execute("let m = {a: 1}; delete m.a; return m.length").unwrap(), Value::Int(0));
}

#[test]
fn test_index_errors() {
    assert_eq!(run_error("let a = [1]; return a[3]"), "Index out of range");
    assert_eq!(run_error("let a = [1]; a[3] = 1"), "Index 3 is out of range. Length is 1");
    assert_eq!(run_error("let a = null; return a.b"), "Cant read property b of null");
    assert_eq!(run_error("let a = 1; return a.b"), "Can't read 'b' from 1 (int)");
}

#[test]
fn test_string_access() {
    assert_eq!(execute(r#"let s = "héllo"; return s[1]"#).unwrap(), Value::Rune('é'));
    assert_eq!(execute(r#"return "héllo".runeCount"#).unwrap(), Value::Int(5));
    assert_eq!(execute(r#"return "  hi ".trim().toUpper()"#).unwrap(), Value::from("HI"));
}

#[test]
fn test_increments_on_properties() {
    assert_eq!(execute("let m = {n: 1}; m.n++; m.n += 2; return m.n").unwrap(), Value::Int(4));
    assert_eq!(execute("let a = [1]; a[0]--; return a[0]").unwrap(), Value::Int(0));
}

#[test]
fn test_constants_are_readonly() {
    let err = execute("const a = 1; a = 2").unwrap_err();
    assert!(err.contains("can't modify a constant"), "{}", err);
}

#[test]
fn test_globals_keep_literal_values() {
    let cases = [
        ("null", Value::Null),
        ("undefined", Value::Undefined),
        ("7", Value::Int(7)),
        ("0x10", Value::Int(16)),
        ("2.5", Value::Float(2.5)),
        ("true", Value::Bool(true)),
        ("'r'", Value::Rune('r')),
        ("\"text\"", Value::from("text")),
    ];
    for (literal, expected) in cases {
        let vm = initialized_vm(&format!("let a = {}", literal));
        assert_eq!(vm.register_value("a"), Some(expected), "{}", literal);
    }
}
