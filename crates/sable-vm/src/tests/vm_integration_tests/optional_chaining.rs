use super::helpers::{execute, run_error};
use sable_types::Value;

#[test]
fn test_nil_coalescing_after_chain() {
    assert_eq!(execute("let a\nreturn a?.b ?? 2").unwrap(), Value::Int(2));
}

#[test]
fn test_chain_reads_through() {
    let source = "let m = { x: { y: 3 } }\nreturn m?.x?.y";
    assert_eq!(execute(source).unwrap(), Value::Int(3));
}

#[test]
fn test_short_circuit_skips_arguments() {
    let source = r#"
        let calls = 0
        function touch() { calls++; return 1 }
        let a = null
        let r = a?.b(touch())
        return calls
    "#;
    assert_eq!(execute(source).unwrap(), Value::Int(0));
}

#[test]
fn test_short_circuit_skips_rest_of_chain() {
    let source = r#"
        let a = null
        let r = a?.b.c.d
        return r == null
    "#;
    assert_eq!(execute(source).unwrap(), Value::Bool(true));
}

#[test]
fn test_optional_call() {
    assert_eq!(execute("let f = null\nreturn f?.()").unwrap(), Value::Null);
    assert_eq!(execute("let f = (x) => x + 1\nreturn f?.(1)").unwrap(), Value::Int(2));
}

#[test]
fn test_optional_index() {
    assert_eq!(execute("let a\nreturn a?.[0] ?? 9").unwrap(), Value::Int(9));
    assert_eq!(execute("let a = [4]\nreturn a?.[0]").unwrap(), Value::Int(4));
}

#[test]
fn test_missing_member_then_optional() {
    assert_eq!(execute("let m = {}\nreturn m.x?.y ?? 1").unwrap(), Value::Int(1));
}

#[test]
fn test_plain_access_still_fails() {
    assert_eq!(run_error("let m = {}\nreturn m.x.y"), "Cant read property y of undefined");
}
