//! Sable Virtual Machine
//!
//! This crate compiles Sable source into a register based bytecode and runs
//! it. Scripts are sandboxed: a host decides which native functions exist,
//! which permissions a program holds and how many steps, allocations and
//! call frames it may use.
//!
//! # Architecture
//!
//! - Every function owns a register file sized at compile time. Operands
//!   are typed addresses (local, global, constant, closure cell, ...)
//! - Variables captured by closures are shared cells into the register file
//!   of the frame that declared them
//! - Frame 0 runs the global function; its registers are the globals and
//!   stay alive after initialization so `main` and other functions can be
//!   called many times
//!
//! # Modules
//!
//! - `opcode`: Instruction set definitions
//! - `bytecode`: Addresses, functions, classes, enums and the program
//! - `compiler`: Module graph to bytecode compiler
//! - `vm`: Virtual machine execution engine
//! - `builtins`: Native function registry and the default natives
//! - `bytecode_debug`: Text dumps of compiled programs
//! - `error`: Error types for VM and compiler

#![allow(clippy::result_large_err)]

pub mod builtins;
pub mod bytecode;
pub mod bytecode_debug;
pub mod compiler;
pub mod error;
pub mod opcode;
pub mod vm;

// Re-export main types
pub use builtins::{create_native_registry, NativeFn, NativeFunction, NativeRegistry};
pub use bytecode::{Address, AddressKind, Program};
pub use bytecode_debug::{dump_function, dump_program};
pub use compiler::Compiler;
pub use error::{CompileError, VmError};
pub use opcode::OpCode;
pub use vm::{Finalizer, Output, Vm, VmConfig};

use sable_parser::{FsLoader, ModuleGraph};
use sable_types::sync::Arc;
use std::path::Path;

/// Compiles a loaded module graph.
pub fn compile(graph: &ModuleGraph, natives: Arc<NativeRegistry>) -> Result<Program, VmError> {
    Ok(Compiler::new(natives).compile(graph)?)
}

/// Compiles a single file of source with the default natives.
pub fn compile_str(source: &str) -> Result<Program, VmError> {
    let file = sable_parser::parse(source)?;
    compile(&ModuleGraph::single(file), Arc::new(create_native_registry()))
}

/// Loads `path` and every module it imports from the file system and
/// compiles them with the default natives.
pub fn compile_path(path: impl AsRef<Path>) -> Result<Program, VmError> {
    let path = path.as_ref();
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    let entry = path
        .file_name()
        .map(|n| format!("/{}", n.to_string_lossy()))
        .unwrap_or_default();

    let loader = FsLoader::new(root);
    let graph = ModuleGraph::load(&loader, &entry)?;
    compile(&graph, Arc::new(create_native_registry()))
}

#[cfg(test)]
mod tests;
