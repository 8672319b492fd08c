use super::helpers::{compile, execute, run_error};
use crate::vm::Vm;
use sable_types::sync::Arc;
use sable_types::Value;

#[test]
fn test_catch_then_finally() {
    let src = r#"
        let x = 0
        try { 1 / 0 } catch { x = 5 } finally { x -= 1 }
        return x
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(4));
}

#[test]
fn test_catch_binding() {
    let src = r#"
        try {
            throw "boom"
        } catch (e) {
            return e.message
        }
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("boom"));
}

#[test]
fn test_uncaught_throw() {
    assert_eq!(run_error(r#"throw "bad""#), "bad");
}

#[test]
fn test_error_crosses_frames() {
    let src = r#"
        function inner() { let a = [1]; return a[5] }
        function outer() { return inner() }
        let msg = ""
        try {
            outer()
        } catch (e) {
            msg = e.message
        }
        return msg
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("Index out of range"));
}

#[test]
fn test_finally_runs_on_return() {
    let src = r#"
        let log = ""
        function f() {
            try {
                return 1
            } finally {
                log += "finally"
            }
        }
        let v = f()
        return log + v
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("finally1"));
}

#[test]
fn test_finally_runs_on_break() {
    let src = r#"
        let log = ""
        for (let i = 0; i < 3; i++) {
            try {
                if (i == 1) break
                log += i
            } finally {
                log += "f"
            }
        }
        return log
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("0ff"));
}

#[test]
fn test_finally_runs_on_continue() {
    let src = r#"
        let n = 0
        for (let i = 0; i < 3; i++) {
            try {
                continue
            } finally {
                n++
            }
        }
        return n
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(3));
}

#[test]
fn test_error_without_catch_runs_finally() {
    let src = r#"
        let log = ""
        try {
            try {
                throw "inner"
            } finally {
                log += "f"
            }
        } catch (e) {
            log += e.message
        }
        return log
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("finner"));
}

#[test]
fn test_error_in_finally_wins() {
    let src = r#"
        try {
            try {
                throw "first"
            } finally {
                throw "second"
            }
        } catch (e) {
            return e.message
        }
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("second"));
}

#[test]
fn test_error_in_catch_goes_to_outer_try() {
    let src = r#"
        let log = ""
        try {
            try {
                throw "a"
            } catch (e) {
                throw e.message + "b"
            }
        } catch (e) {
            log = e.message
        }
        return log
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("ab"));
}

#[test]
fn test_error_kinds() {
    let src = r#"
        try {
            throw errors.newError("no such file", "NotFound")
        } catch (e) {
            return errors.is(e, "NotFound") && !errors.is(e, "Other") && e.kind == "NotFound"
        }
    "#;
    assert_eq!(execute(src).unwrap(), Value::Bool(true));
}

#[test]
fn test_rethrow_keeps_trace() {
    let src = r#"
        function fail() {
            throw errors.newError("deep")
        }
        function main() {
            try {
                fail()
            } catch (e) {
                throw e
            }
        }
    "#;
    let mut vm = Vm::new(Arc::new(compile(src).unwrap()));
    let err = vm.run(&[]).unwrap_err();
    let script = err.as_script().unwrap();
    assert_eq!(script.message, "deep");
    assert_eq!(script.trace[0].function, "fail");
}

#[test]
fn test_uncaught_error_trace() {
    let src = r#"
        function inner() {
            return 1 / 0
        }
        function main() {
            return inner()
        }
    "#;
    let mut vm = Vm::new(Arc::new(compile(src).unwrap()));
    let err = vm.run(&[]).unwrap_err();
    let trace: Vec<_> = err.as_script().unwrap().trace.iter().map(|t| t.function.clone()).collect();
    assert_eq!(trace, vec!["inner".to_string(), "main".to_string()]);
    assert_eq!(err.as_script().unwrap().trace[0].line, 3);
}

#[test]
fn test_vm_is_usable_after_an_error() {
    let mut vm = Vm::new(Arc::new(compile("function f(x) { return 10 / x }").unwrap()));
    vm.initialize().unwrap();
    assert!(vm.run_func("f", &[Value::Int(0)]).is_err());
    assert_eq!(vm.run_func("f", &[Value::Int(5)]).unwrap(), Value::Float(2.0));
}

#[test]
fn test_return_in_finally_overrides() {
    let src = r#"
        function f() {
            try {
                return 1
            } finally {
                return 2
            }
        }
        function g() {
            try {
                throw "lost"
            } finally {
                return 3
            }
        }
        return f() * 10 + g()
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(23));
}

#[test]
fn test_break_out_of_finally_is_rejected() {
    let src = r#"
        while (true) {
            try { } finally { break }
        }
    "#;
    let err = execute(src).unwrap_err();
    assert!(err.contains("Control cannot leave the body of a finally clause"), "{}", err);
}
