use super::helpers::{execute, execute_with, initialized_vm, run_error};
use crate::vm::VmConfig;
use sable_types::Value;

#[test]
fn test_recursive_fib() {
    let src = r#"
        function fib(n) {
            if (n < 2) return n
            return fib(n - 1) + fib(n - 2)
        }
        return fib(6)
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(8));
}

#[test]
fn test_main_is_called() {
    let src = r#"
        let base = 40
        function main() {
            return base + 2
        }
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(42));
}

#[test]
fn test_optional_parameters() {
    let src = r#"
        function f(a, b?) { return b ?? a * 10 }
        return f(1) + f(1, 2)
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(12));
}

#[test]
fn test_missing_arguments() {
    let err = run_error("function f(a, b) { return a } f(1)");
    assert!(err.contains("expects 2 parameters, got 1"), "{}", err);
}

#[test]
fn test_extra_arguments_are_ignored() {
    assert_eq!(execute("function f(a) { return a } return f(1, 2, 3)").unwrap(), Value::Int(1));
}

#[test]
fn test_variadic_and_spread() {
    let src = r#"
        function sum(first, ...rest) {
            let t = first
            for (let x of rest) t += x
            return t
        }
        let xs = [2, 3]
        return sum(1) + sum(1, ...xs)
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(7));
}

#[test]
fn test_lambdas() {
    let src = r#"
        let double = (x) => x * 2
        let add = function (a, b) { return a + b }
        return add(double(4), 1)
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(9));
}

#[test]
fn test_functions_are_values() {
    let src = r#"
        function apply(f, v) { return f(v) }
        function inc(v) { return v + 1 }
        return apply(inc, 1)
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(2));
}

#[test]
fn test_calling_a_non_function() {
    assert_eq!(run_error("let a = 1; a()"), "Invalid value. Expected a function, got int");
}

#[test]
fn test_tail_call_uses_no_frames() {
    let src = r#"
        function count(n, acc) {
            if (n == 0) return acc
            return count(n - 1, acc + 1)
        }
        return count(10000, 0)
    "#;
    let config = VmConfig::default().with_max_frames(5);
    assert_eq!(execute_with(src, config).unwrap(), Value::Int(10000));
}

#[test]
fn test_deep_recursion_hits_frame_limit() {
    let src = r#"
        function down(n) {
            if (n == 0) return 0
            return 1 + down(n - 1)
        }
        return down(100)
    "#;
    let config = VmConfig::default().with_max_frames(10);
    let err = execute_with(src, config).unwrap_err();
    assert_eq!(err.message(), "Max stack frames reached: 10");
}

#[test]
fn test_run_func_by_name() {
    let mut vm = initialized_vm("function add(a, b) { return a + b }");
    let v = vm.run_func("add", &[Value::Int(2), Value::Int(3)]).unwrap();
    assert_eq!(v, Value::Int(5));

    let err = vm.run_func("add", &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap_err();
    assert_eq!(err.message(), "function 'add' expects only 2 parameters, got 3");

    let err = vm.run_func("nope", &[]).unwrap_err();
    assert_eq!(err.message(), "nope: function does not exist");
}

#[test]
fn test_run_func_sees_globals() {
    let mut vm = initialized_vm("let total = 0; function bump() { total++; return total }");
    vm.run_func("bump", &[]).unwrap();
    assert_eq!(vm.run_func("bump", &[]).unwrap(), Value::Int(2));
    assert_eq!(vm.register_value("total"), Some(Value::Int(2)));
}
