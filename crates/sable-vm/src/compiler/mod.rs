//! Bytecode compiler (AST to bytecode)
//!
//! A [`ModuleGraph`] compiles into one [`Program`]. Every file shares a
//! single global function: module globals live there too, namespaced by
//! the module's absolute path, so an import is just a prefixed lookup.
//!
//! Order matters. `declare global` statements go first, then the imported
//! modules (dependencies before dependents), then the main file. Names used
//! before their declaration are patched at the end, and the generated calls
//! to every `init` function close the global function.

use crate::builtins::NativeRegistry;
use crate::bytecode::{
    Address, AddressKind, Function, FunctionKind, Instruction, Position, Program,
};
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::{File, Import, Stmt};
use sable_parser::{ModuleGraph, Pos};
use sable_types::sync::Arc;
use std::collections::{HashMap, HashSet};
use tracing::debug;

// Module structure
mod classes;
mod constants;
mod context;
mod control_flow;
mod expressions;
mod registers;
mod statements;
mod symbols;

use context::{Branch, ClosureRef, FunctionInfo, Unresolved};

/// Prefix of the names declared in `declare global` blocks.
pub(crate) const GLOBAL_NAMESPACE: &str = "--globalnamespace";

/// Name of the function that holds every global statement.
pub(crate) const GLOBAL_FUNCTION: &str = "@global";

/// Bytecode compiler
pub struct Compiler {
    pub(crate) program: Program,

    /// Compile-time data of each function, parallel to `program.functions`.
    pub(crate) infos: Vec<FunctionInfo>,

    /// Function being compiled
    pub(crate) current: usize,

    /// Class whose body is being compiled
    pub(crate) current_class: Option<usize>,

    /// Absolute path of the module being compiled, empty for the main file.
    pub(crate) module_prefix: String,

    file: String,
    file_index: usize,

    /// Imports of the file being compiled
    pub(crate) imports: Vec<Import>,
    module_imports: HashMap<String, Vec<Import>>,

    pub(crate) unresolved: Vec<Unresolved>,

    /// Captured registers of the top level function being compiled.
    pub(crate) closures: Vec<ClosureRef>,

    /// Loops, switches and try blocks of the function being compiled.
    pub(crate) branches: Vec<Branch>,

    /// Open optional chains: pcs of their `SetRegister` instructions.
    pub(crate) opt_chains: Vec<Vec<usize>>,

    /// Registered names of the `init` functions.
    pub(crate) init_funcs: Vec<String>,

    /// Registered name -> function index. Methods are not here.
    pub(crate) functions: HashMap<String, usize>,
}

impl Compiler {
    /// Create a compiler for a new program
    pub fn new(natives: Arc<NativeRegistry>) -> Self {
        let mut program = Program::new(natives);
        let mut global = Function::new(GLOBAL_FUNCTION, 0, FunctionKind::Global);
        global.is_global = true;
        program.functions.push(global);
        Self::for_program(program)
    }

    /// A compiler that keeps adding to an already compiled program.
    pub(crate) fn for_program(program: Program) -> Self {
        let functions = program
            .functions
            .iter()
            .filter(|f| !f.is_class)
            .map(|f| (f.name.clone(), f.index))
            .collect();

        Self {
            infos: vec![FunctionInfo::default(); program.functions.len()],
            program,
            current: 0,
            current_class: None,
            module_prefix: String::new(),
            file: String::new(),
            file_index: 0,
            imports: Vec::new(),
            module_imports: HashMap::new(),
            unresolved: Vec::new(),
            closures: Vec::new(),
            branches: Vec::new(),
            opt_chains: Vec::new(),
            init_funcs: Vec::new(),
            functions,
        }
    }

    /// Compile a module graph into a program
    pub fn compile(mut self, graph: &ModuleGraph) -> Result<Program, CompileError> {
        self.set_file(&graph.main.path);
        self.module_prefix = GLOBAL_NAMESPACE.to_string();
        self.compile_stmts(&graph.global)?;

        let mut done = HashSet::new();
        done.insert(graph.main.path.clone());
        for import in &graph.main.imports {
            self.compile_module(graph, &import.abs_path, &mut done)?;
        }

        self.module_prefix.clear();
        self.compile_file(&graph.main)?;
        self.finish()
    }

    /// Compiles `file` at the end of the global function of the program.
    /// Returns the pc where the new code starts.
    pub(crate) fn compile_appended(&mut self, file: &File) -> Result<usize, CompileError> {
        self.current = 0;
        self.module_prefix.clear();
        let start = self.pc();
        self.compile_file(file)?;
        self.fix_unresolved()?;
        Ok(start)
    }

    pub(crate) fn into_program(mut self) -> Program {
        self.seal_global();
        self.program
    }

    fn compile_module(
        &mut self,
        graph: &ModuleGraph,
        path: &str,
        done: &mut HashSet<String>,
    ) -> Result<(), CompileError> {
        if !done.insert(path.to_string()) {
            return Ok(());
        }

        let file = graph.modules.get(path).ok_or_else(|| {
            CompileError::new(format!("Module not found: {}", path), &self.file, Pos::default())
        })?;

        // dependencies first so their globals exist when this module runs
        for import in &file.imports {
            self.compile_module(graph, &import.abs_path, done)?;
        }

        debug!(module = %path, "compiling module");
        self.module_prefix = path.to_string();
        self.compile_file(file)
    }

    fn compile_file(&mut self, file: &File) -> Result<(), CompileError> {
        self.set_file(&file.path);
        self.imports = file.imports.clone();
        self.module_imports
            .insert(self.module_prefix.clone(), file.imports.clone());

        for attr in &file.attributes {
            if !self.program.attributes.contains(attr) {
                self.program.attributes.push(attr.clone());
            }
        }

        self.compile_stmts(&file.stmts)
    }

    fn finish(mut self) -> Result<Program, CompileError> {
        self.fix_unresolved()?;
        self.generate_inits()?;
        self.emit(OpCode::Return, Address::VOID, Address::VOID, Address::VOID, Pos::default());
        self.seal_global();

        debug!(
            functions = self.program.functions.len(),
            constants = self.program.constants.len(),
            "program compiled"
        );
        Ok(self.program)
    }

    fn seal_global(&mut self) {
        let global = &mut self.program.functions[0];
        global.max_reg = global.registers.len();
        self.program.invalidate_index();
    }

    /// Calls every `init` function, sorted by name, at the end of the
    /// global function.
    fn generate_inits(&mut self) -> Result<(), CompileError> {
        if self.init_funcs.is_empty() {
            return Ok(());
        }

        self.module_prefix.clear();
        self.current = 0;

        let mut names = std::mem::take(&mut self.init_funcs);
        names.sort();
        for name in names {
            let index = match self.functions.get(&name) {
                Some(&i) => i,
                None => continue,
            };
            self.emit(
                OpCode::Call,
                Address::function(index),
                Address::VOID,
                Address::VOID,
                Pos::default(),
            );
        }
        Ok(())
    }

    /// Patches every operand that referenced a name declared later.
    pub(crate) fn fix_unresolved(&mut self) -> Result<(), CompileError> {
        if self.unresolved.is_empty() {
            return Ok(());
        }

        let saved_prefix = std::mem::take(&mut self.module_prefix);
        let saved_imports = std::mem::take(&mut self.imports);
        let saved_current = self.current;
        self.current = 0;

        let pending = std::mem::take(&mut self.unresolved);
        let mut resolved = Vec::with_capacity(pending.len());

        for u in &pending {
            self.module_prefix = u.module.clone();
            self.imports = self.module_imports.get(&u.module).cloned().unwrap_or_default();

            let mut addr = self.find_register(&u.name, 0, u.pos)?;
            if addr.is_void() && !u.module.is_empty() {
                addr = self.find_register(&format!("{}.{}", u.module, u.name), 0, u.pos)?;
            }

            if addr.is_void() {
                return Err(CompileError::new(
                    format!("Undeclared identifier: {}", u.name),
                    &u.file,
                    u.pos,
                ));
            }

            // a global read in its own module before it is declared
            if addr.kind == AddressKind::Global && u.func == 0 {
                let global = &self.program.functions[0];
                if let Some(r) = global.registers.get(addr.index()) {
                    if r.module == u.module && r.start_pc >= u.pc {
                        return Err(CompileError::new(
                            format!("Undeclared identifier: {}", u.name),
                            &u.file,
                            u.pos,
                        ));
                    }
                }
            }

            resolved.push(addr);
        }

        for f in self.program.functions.iter_mut() {
            for instr in f.instructions.iter_mut() {
                for op in instr.operands_mut() {
                    if op.kind == AddressKind::Unresolved {
                        if let Some(addr) = resolved.get(op.index()) {
                            *op = *addr;
                        }
                    }
                }
            }
        }

        self.module_prefix = saved_prefix;
        self.imports = saved_imports;
        self.current = saved_current;
        Ok(())
    }

    pub(crate) fn compile_stmts(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        // enums and classes first: any statement may reference them
        let (types, rest): (Vec<&Stmt>, Vec<&Stmt>) = stmts
            .iter()
            .partition(|s| matches!(s, Stmt::Enum(_) | Stmt::Class(_)));

        for stmt in types.into_iter().chain(rest) {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    // ===== Helper methods =====

    fn set_file(&mut self, path: &str) {
        self.file = path.to_string();
        self.file_index = self.program.file_index(path);
    }

    pub(crate) fn error(&self, message: impl Into<String>, pos: Pos) -> CompileError {
        CompileError::new(message, &self.file, pos)
    }

    /// Emit an instruction in the current function and return its pc
    pub(crate) fn emit(&mut self, opcode: OpCode, a: Address, b: Address, c: Address, pos: Pos) -> usize {
        let file = self.file_index;
        let f = &mut self.program.functions[self.current];
        f.instructions.push(Instruction::new(opcode, a, b, c));
        f.positions.push(Position {
            file,
            line: pos.line,
            column: pos.column,
        });
        f.instructions.len() - 1
    }

    /// Next pc of the current function
    pub(crate) fn pc(&self) -> usize {
        self.program.functions[self.current].instructions.len()
    }

    pub(crate) fn instr_mut(&mut self, pc: usize) -> &mut Instruction {
        &mut self.program.functions[self.current].instructions[pc]
    }

    pub(crate) fn func(&self) -> &Function {
        &self.program.functions[self.current]
    }

    pub(crate) fn func_mut(&mut self) -> &mut Function {
        &mut self.program.functions[self.current]
    }

    pub(crate) fn current_file(&self) -> &str {
        &self.file
    }
}
