use super::helpers::{compile_with, execute_with, init_test_logging};
use crate::builtins::{create_native_registry, NativeFunction};
use crate::error::VmError;
use crate::vm::{Finalizer, Vm, VmConfig};
use sable_types::sync::Arc;
use sable_types::{ScriptError, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_step_limit() {
    let config = VmConfig::default().with_max_steps(1000);
    let err = execute_with("while (true) { }", config).unwrap_err();
    assert_eq!(err.message(), "Step limit reached: 1000");
}

#[test]
fn test_step_limit_survives_catch() {
    let source = r#"
        try {
            while (true) { }
        } catch (e) {
            let x = 1
        }
    "#;
    let config = VmConfig::default().with_max_steps(500);
    let err = execute_with(source, config).unwrap_err();
    assert_eq!(err.message(), "Step limit reached: 500");
}

#[test]
fn test_steps_reset_between_runs() {
    init_test_logging();
    let program = compile_with("function f() { return 1 }", create_native_registry()).unwrap();
    let mut vm = Vm::with_config(Arc::new(program), VmConfig::default().with_max_steps(50));
    for _ in 0..10 {
        vm.reset_steps();
        assert_eq!(vm.run_func("f", &[]).unwrap(), Value::Int(1));
    }
    assert!(vm.steps() > 0);
}

#[test]
fn test_allocation_limit() {
    let source = r#"
        let s = ""
        for (let i = 0; i < 1000; i++) {
            s += "0123456789"
        }
    "#;
    let config = VmConfig::default().with_max_allocations(500);
    let err = execute_with(source, config).unwrap_err();
    assert_eq!(err.message(), "Max allocations reached: 500");
}

#[test]
fn test_unlimited_by_default() {
    let source = "let n = 0\nfor (let i = 0; i < 10000; i++) { n += i }\nreturn n";
    assert_eq!(execute_with(source, VmConfig::unlimited()).unwrap(), Value::Int(49995000));
}

fn secret(_vm: &mut Vm, _this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    Ok(Value::from("42"))
}

fn run_secret(source: &str) -> Result<Value, VmError> {
    init_test_logging();
    let mut natives = create_native_registry();
    natives.add(NativeFunction::new("test.secret", 0, secret).with_permissions(&["fs"]));
    let program = compile_with(source, natives)?;
    Vm::new(Arc::new(program)).run(&[])
}

#[test]
fn test_native_without_permission() {
    let err = run_secret("return test.secret()").unwrap_err();
    assert_eq!(err.message(), "unauthorized");
}

#[test]
fn test_program_permission() {
    let source = "// [permissions fs]\n\nreturn test.secret()";
    assert_eq!(run_secret(source).unwrap(), Value::from("42"));
}

#[test]
fn test_trusted_program() {
    let source = "// [permissions trusted]\n\nreturn test.secret()";
    assert_eq!(run_secret(source).unwrap(), Value::from("42"));
}

#[test]
fn test_function_permission() {
    let source = r#"
        // [permissions fs]
        function read() {
            return test.secret()
        }
        function main() {
            return read()
        }
    "#;
    assert_eq!(run_secret(source).unwrap(), Value::from("42"));

    let source = r#"
        // [permissions fs]
        function read() {
            return 1
        }
        function main() {
            return test.secret()
        }
    "#;
    assert_eq!(run_secret(source).unwrap_err().message(), "unauthorized");
}

struct Count(&'static AtomicUsize);

impl Finalizer for Count {
    fn close(&mut self) -> Result<(), ScriptError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

static ON_RETURN: AtomicUsize = AtomicUsize::new(0);
static ON_ERROR: AtomicUsize = AtomicUsize::new(0);

fn defer_return(vm: &mut Vm, _this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    vm.add_finalizer(Box::new(Count(&ON_RETURN)));
    Ok(Value::Null)
}

fn defer_error(vm: &mut Vm, _this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    vm.add_finalizer(Box::new(Count(&ON_ERROR)));
    Ok(Value::Null)
}

fn run_with_defer(source: &str) -> Result<Value, VmError> {
    init_test_logging();
    let mut natives = create_native_registry();
    natives.add(NativeFunction::new("test.deferReturn", 0, defer_return));
    natives.add(NativeFunction::new("test.deferError", 0, defer_error));
    let program = compile_with(source, natives)?;
    Vm::new(Arc::new(program)).run(&[])
}

#[test]
fn test_finalizers_run_on_return() {
    let source = r#"
        function work() {
            test.deferReturn()
            return 1
        }
        function main() {
            work()
            work()
            return 0
        }
    "#;
    run_with_defer(source).unwrap();
    assert_eq!(ON_RETURN.load(Ordering::SeqCst), 2);
}

#[test]
fn test_finalizers_run_on_error() {
    let source = r#"
        function work() {
            test.deferError()
            throw "boom"
        }
        function main() {
            work()
        }
    "#;
    let err = run_with_defer(source).unwrap_err();
    assert_eq!(err.message(), "boom");
    assert_eq!(ON_ERROR.load(Ordering::SeqCst), 1);
}

static GLOBAL: AtomicUsize = AtomicUsize::new(0);

#[test]
fn test_global_finalizer_runs_once_per_run() {
    init_test_logging();
    let program = compile_with("function main() { return 1 }", create_native_registry()).unwrap();
    let mut vm = Vm::new(Arc::new(program));
    vm.add_global_finalizer(Box::new(Count(&GLOBAL)));
    vm.run(&[]).unwrap();
    vm.run(&[]).unwrap();
    assert_eq!(GLOBAL.load(Ordering::SeqCst), 1);
}
