//! Evaluating code against a running program

use super::Vm;
use crate::bytecode::{Address, Program};
use crate::compiler::Compiler;
use crate::error::VmError;
use crate::opcode::OpCode;
use sable_parser::{Pos, Stmt};
use sable_types::sync::Arc;
use sable_types::Value;
use tracing::debug;

impl Vm {
    /// Compiles `code` at the end of the global function and runs it with
    /// the current globals. New declarations stay visible to later calls.
    ///
    /// A single expression evaluates to its value; anything else returns
    /// `None`. On errors the program and the globals are left as they were.
    pub fn eval(&mut self, code: &str) -> Result<Option<Value>, VmError> {
        let mut file = sable_parser::parse(code)?;

        let single = matches!(file.stmts.as_slice(), [Stmt::Expr(_)]);
        if let (true, Some(Stmt::Expr(expr))) = (single, file.stmts.pop()) {
            let pos = expr.pos();
            file.stmts.push(Stmt::Return {
                value: Some(expr),
                pos,
            });
        }

        if !self.initialized {
            self.initialize()?;
        }
        if self.frames.len() != 1 {
            return Err(VmError::new("eval can't run while a function is running"));
        }

        let mut compiler = Compiler::for_program(Program::clone(&self.program));
        let start = compiler.compile_appended(&file)?;
        compiler.emit(OpCode::Return, Address::VOID, Address::VOID, Address::VOID, Pos::default());
        let program = Arc::new(compiler.into_program());
        let size = program.functions.first().map(|g| g.max_reg).unwrap_or(0);
        debug!(start, globals = size, "eval");

        let previous = std::mem::replace(&mut self.program, program);
        let saved_values = self.globals();
        let saved_pc = self.frames[0].pc;

        self.frames[0].values.write().resize(size, Value::Null);
        self.frames[0].pc = start;

        let result = self.execute_frames(0);
        self.frames[0].pc = saved_pc;

        match result {
            Ok(value) => Ok(single.then_some(value)),
            Err(err) => {
                self.program = previous;
                *self.frames[0].values.write() = saved_values;
                Err(err)
            }
        }
    }
}
