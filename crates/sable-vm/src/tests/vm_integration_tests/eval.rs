use super::helpers::{compile, initialized_vm};
use crate::vm::{Vm, VmConfig};
use sable_types::sync::Arc;
use sable_types::Value;

#[test]
fn test_eval_expression() {
    let mut vm = initialized_vm("");
    assert_eq!(vm.eval("1 + 2").unwrap(), Some(Value::Int(3)));
}

#[test]
fn test_eval_sees_globals() {
    let mut vm = initialized_vm("let base = 7\nfunction twice(x) { return x * 2 }");
    assert_eq!(vm.eval("twice(base) + 1").unwrap(), Some(Value::Int(15)));
}

#[test]
fn test_eval_declarations_persist() {
    let mut vm = initialized_vm("");
    assert_eq!(vm.eval("let z = 5").unwrap(), None);
    vm.eval("function inc(x) { return x + z }").unwrap();
    assert_eq!(vm.eval("inc(z)").unwrap(), Some(Value::Int(10)));
}

#[test]
fn test_eval_compile_error_keeps_program() {
    let mut vm = initialized_vm("let base = 1");
    assert!(vm.eval("let = ").is_err());
    assert!(vm.eval("missing()").is_err());
    assert_eq!(vm.eval("base").unwrap(), Some(Value::Int(1)));
}

#[test]
fn test_eval_runtime_error_rolls_back() {
    let mut vm = initialized_vm("let base = 1");
    let err = vm.eval("let q = 1\nbase = 2\nq / 0").unwrap_err();
    assert_eq!(err.message(), "Attempt to divide by zero");
    assert!(vm.eval("q").is_err());
    assert_eq!(vm.eval("base").unwrap(), Some(Value::Int(1)));
}

#[test]
fn test_fork_copies_globals() {
    let mut vm = initialized_vm("let n = 1\nfunction get() { return n }\nfunction put(v) { n = v }");
    let mut fork = vm.fork();
    fork.run_func("put", &[Value::Int(5)]).unwrap();
    assert_eq!(fork.run_func("get", &[]).unwrap(), Value::Int(5));
    assert_eq!(vm.run_func("get", &[]).unwrap(), Value::Int(1));
}

#[test]
fn test_with_globals() {
    let vm = initialized_vm("let n = 3\nfunction get() { return n }");
    let globals = vm.globals();

    let mut restored = Vm::with_globals(Arc::clone(vm.program()), globals, VmConfig::default()).unwrap();
    assert_eq!(restored.run_func("get", &[]).unwrap(), Value::Int(3));

    let program = Arc::new(compile("let a = 1\nlet b = 2").unwrap());
    let err = Vm::with_globals(program, Vec::new(), VmConfig::default()).err().unwrap();
    assert_eq!(err.message(), "invalid globals size");
}
