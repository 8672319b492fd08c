//! Helper functions and common imports for integration tests.

use crate::builtins::{create_native_registry, NativeRegistry};
use crate::bytecode::Program;
use crate::compiler::Compiler;
use crate::error::VmError;
use crate::vm::{Vm, VmConfig};
use sable_parser::{MemoryLoader, ModuleGraph};
use sable_types::sync::{Arc, Mutex};
use sable_types::Value;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Routes VM logs to the test output. Set `RUST_LOG=sable_vm=trace` to see
/// every call and return.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn compile_with(source: &str, natives: NativeRegistry) -> Result<Program, VmError> {
    let file = sable_parser::parse(source)?;
    Ok(Compiler::new(Arc::new(natives)).compile(&ModuleGraph::single(file))?)
}

pub fn compile(source: &str) -> Result<Program, VmError> {
    compile_with(source, create_native_registry())
}

/// Helper to compile and execute source code
pub fn execute(source: &str) -> Result<Value, String> {
    init_test_logging();
    let program = compile(source).map_err(|e| format!("Compile error: {}", e))?;
    let mut vm = Vm::new(Arc::new(program));
    vm.run(&[]).map_err(|e| format!("Runtime error: {}", e.message()))
}

/// Runs with limits and keeps the VM error.
pub fn execute_with(source: &str, config: VmConfig) -> Result<Value, VmError> {
    init_test_logging();
    let program = compile(source)?;
    let mut vm = Vm::with_config(Arc::new(program), config);
    vm.run(&[])
}

/// The message of the error a script ends with.
pub fn run_error(source: &str) -> String {
    init_test_logging();
    let program = compile(source).expect("compile");
    let mut vm = Vm::new(Arc::new(program));
    match vm.run(&[]) {
        Ok(v) => panic!("expected an error, got {:?}", v),
        Err(e) => e.message().to_string(),
    }
}

/// A VM over `source` whose globals are initialized.
pub fn initialized_vm(source: &str) -> Vm {
    init_test_logging();
    let program = compile(source).expect("compile");
    let mut vm = Vm::new(Arc::new(program));
    vm.initialize().expect("initialize");
    vm
}

/// Compiles and runs `/main.ts` out of in-memory files.
pub fn execute_modules(files: &[(&str, &str)]) -> Result<Value, String> {
    init_test_logging();
    let loader = files
        .iter()
        .fold(MemoryLoader::new(), |l, (path, src)| l.with_file(path, src));
    let graph = ModuleGraph::load(&loader, "/main.ts").map_err(|e| format!("Parse error: {}", e))?;
    let program = Compiler::new(Arc::new(create_native_registry()))
        .compile(&graph)
        .map_err(|e| format!("Compile error: {}", e))?;
    let mut vm = Vm::new(Arc::new(program));
    vm.run(&[]).map_err(|e| format!("Runtime error: {}", e.message()))
}

/// A writer tests can read back.
#[derive(Clone, Default)]
pub struct Capture(pub Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `source` and returns what it printed.
pub fn output_of(source: &str) -> String {
    init_test_logging();
    let program = compile(source).expect("compile");
    let mut vm = Vm::new(Arc::new(program));
    let capture = Capture::default();
    vm.set_output(Box::new(capture.clone()));
    vm.run(&[]).expect("run");
    capture.text()
}
