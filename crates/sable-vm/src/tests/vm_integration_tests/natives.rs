use super::helpers::{compile_with, execute, initialized_vm, output_of, run_error};
use crate::builtins::{create_native_registry, NativeFunction};
use crate::error::VmError;
use crate::vm::Vm;
use sable_types::sync::{Arc, Mutex};
use sable_types::{HostObject, Object, ScriptError, Value};

#[test]
fn test_print_goes_to_output() {
    let out = output_of("print(\"a\", 1)\nprintln(\"b\", true)\nprintln([1, 2])");
    assert_eq!(out, "a 1b true\n[1, 2]\n");
}

#[test]
fn test_array_prototype() {
    let source = r#"
        let a = [1]
        a.push(2, 3)
        a.pop()
        return a.join(",") + ":" + a.indexOf(2)
    "#;
    assert_eq!(execute(source).unwrap(), Value::from("1,2:1"));
}

#[test]
fn test_string_prototype() {
    let source = r#"
        let parts = "  a-b ".trim().toUpper().split("-")
        return parts.length + parts[1]
    "#;
    assert_eq!(execute(source).unwrap(), Value::from("2B"));
}

#[test]
fn test_math() {
    assert_eq!(execute("return Math.max(1, 5, 3)").unwrap(), Value::Int(5));
    assert_eq!(execute("return Math.min(2, 0.5)").unwrap(), Value::Float(0.5));
    let err = run_error("return Math.max(\"a\")");
    assert_eq!(err, "max: expected numbers, got string");
}

#[test]
fn test_json_stringify() {
    assert_eq!(execute("return JSON.stringify({ a: 1 })").unwrap(), Value::from("{\"a\":1}"));
    assert_eq!(execute("return JSON.stringify([1, \"x\", null])").unwrap(), Value::from("[1,\"x\",null]"));
}

#[test]
fn test_native_property() {
    match execute("let a = 1\nreturn runtime.steps").unwrap() {
        Value::Int(n) => assert!(n > 0),
        other => panic!("expected int, got {:?}", other),
    }
    let src = "let before = runtime.steps\nlet x = 1 + 2\nreturn runtime.steps > before";
    assert_eq!(execute(src).unwrap(), Value::Bool(true));
}

#[test]
fn test_native_arity() {
    let err = run_error("return \"x\".split()");
    assert_eq!(err, "function 'String.prototype.split' expects 1 parameters, got 0");
}

#[test]
fn test_unknown_method_is_undefined() {
    assert_eq!(execute("return [1].nope == undefined").unwrap(), Value::Bool(true));
}

fn double(_vm: &mut Vm, _this: &Value, args: &[Value]) -> Result<Value, VmError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n * 2)),
        other => Err(VmError::new(format!("double: expected int, got {}", other.type_name()))),
    }
}

#[test]
fn test_host_registered_native() {
    let mut natives = create_native_registry();
    natives.add(NativeFunction::new("host.double", 1, double));
    let program = compile_with("return host.double(21)", natives).unwrap();
    let mut vm = Vm::new(Arc::new(program));
    assert_eq!(vm.run(&[]).unwrap(), Value::Int(42));
}

#[derive(Default)]
struct Counter {
    total: Mutex<i64>,
}

impl HostObject for Counter {
    fn type_name(&self) -> &str {
        "Counter"
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "total" => Some(Value::Int(*self.total.lock())),
            _ => None,
        }
    }

    fn has_method(&self, name: &str) -> bool {
        name == "add"
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        match (name, args) {
            ("add", [Value::Int(n)]) => {
                *self.total.lock() += n;
                Ok(Value::Null)
            }
            _ => Err(ScriptError::new(format!("Counter.{}: invalid arguments", name))),
        }
    }
}

#[test]
fn test_host_object() {
    let mut vm = initialized_vm("function use(c) { c.add(5); c.add(2); return c.total }");
    let counter = Arc::new(Counter::default());
    let result = vm.run_func("use", &[Value::host(counter.clone())]).unwrap();
    assert_eq!(result, Value::Int(7));
    assert_eq!(*counter.total.lock(), 7);
}

#[test]
fn test_host_object_errors() {
    let mut vm = initialized_vm("function set(c) { c.total = 1 }\nfunction bad(c) { c.add(\"x\") }");
    let counter = Value::host(Arc::new(Counter::default()));

    let err = vm.run_func("set", &[counter.clone()]).unwrap_err();
    assert_eq!(err.message(), "Can't set total of Counter");

    let err = vm.run_func("bad", &[counter]).unwrap_err();
    assert_eq!(err.message(), "Counter.add: invalid arguments");
}

#[test]
fn test_print_array_cycle() {
    let source = "let a = [1]\nlet b = [a]\na.push(b)\nprintln(a)\nprintln(b)\na.pop()";
    assert_eq!(output_of(source), "[1, [[...]]]\n[[1, [...]]]\n");
}

fn boom(_vm: &mut Vm, _this: &Value, _args: &[Value]) -> Result<Value, VmError> {
    panic!("host exploded")
}

fn panicking_vm(source: &str) -> Vm {
    let mut natives = create_native_registry();
    natives.add(NativeFunction::new("test.boom", 0, boom));
    let program = compile_with(source, natives).unwrap();
    Vm::new(Arc::new(program))
}

#[test]
fn test_native_panic_reports_both_stacks() {
    let mut vm = panicking_vm(
        "function f() { return test.boom() }\nfunction main() { return f() }\nfunction ok() { return 1 }",
    );
    let err = vm.run(&[]).unwrap_err();
    let message = err.message();
    assert!(message.starts_with("PANIC: ["), "{}", message);
    assert!(message.contains("host exploded"));
    assert!(message.contains("[script] -> f "), "{}", message);
    assert!(message.contains("[script] -> main "), "{}", message);
    assert!(message.contains("[host]"));

    assert_eq!(vm.run_func("ok", &[]).unwrap(), Value::Int(1));
}

#[test]
fn test_panic_inside_try_leaves_no_handler() {
    let mut vm = panicking_vm("let x = 1");
    vm.initialize().unwrap();

    let err = vm.eval("try { test.boom() } catch (e) { x = 2 }").unwrap_err();
    assert!(err.message().contains("host exploded"));

    let err = vm.eval("throw \"late\"").unwrap_err();
    assert_eq!(err.message(), "late");
    assert_eq!(vm.eval("x").unwrap(), Some(Value::Int(1)));
}

struct Version(i64);

impl HostObject for Version {
    fn type_name(&self) -> &str {
        "Version"
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        (name == "n").then_some(Value::Int(self.0))
    }

    fn compare(&self, other: &Value) -> i32 {
        match other {
            Value::Object(Object::Host(h)) => match h.get_field("n") {
                Some(Value::Int(n)) => self.0.cmp(&n) as i32,
                _ => -2,
            },
            _ => -2,
        }
    }
}

#[test]
fn test_host_object_ordering() {
    let mut vm = initialized_vm("function lt(a, b) { return a < b }\nfunction ge(a, b) { return a >= b }");
    let v1 = Value::host(Arc::new(Version(1)));
    let v2 = Value::host(Arc::new(Version(2)));

    assert_eq!(vm.run_func("lt", &[v1.clone(), v2.clone()]).unwrap(), Value::Bool(true));
    assert_eq!(vm.run_func("ge", &[v2.clone(), v1.clone()]).unwrap(), Value::Bool(true));
    assert_eq!(vm.run_func("lt", &[v2, v1.clone()]).unwrap(), Value::Bool(false));

    let counter = Value::host(Arc::new(Counter::default()));
    let err = vm.run_func("lt", &[v1, counter]).unwrap_err();
    assert!(err.message().starts_with("Invalid operation on"), "{}", err.message());
}
