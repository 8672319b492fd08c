//! Control flow instruction execution

use crate::bytecode::{Address, Instruction};
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::{run_finalizers, Vm};
use sable_types::Value;
use tracing::trace;

/// `TestJump` modes
const JUMP_IF_TRUE: i32 = 0;
const JUMP_IF_FALSE: i32 = 1;
const JUMP_IF_NOT_NIL: i32 = 2;

impl Vm {
    /// Execute control flow instructions
    pub(crate) fn execute_control(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        let Instruction { opcode, a, b, c } = instr;

        match opcode {
            OpCode::Jump => {
                self.inc_pc(a.value)?;
                Ok(ExecutionResult::Next)
            }

            OpCode::JumpBack => {
                self.inc_pc(-a.value)?;
                Ok(ExecutionResult::Continue)
            }

            OpCode::JumpIfEqual | OpCode::JumpIfNotEqual => {
                let equal = self.get(a)?.equals(&self.get(b)?);
                if equal == (opcode == OpCode::JumpIfEqual) {
                    self.inc_pc(c.value)?;
                }
                Ok(ExecutionResult::Next)
            }

            OpCode::TestJump => {
                let value = self.get(a)?;
                let jump = match c.value {
                    JUMP_IF_TRUE => value.is_truthy(),
                    JUMP_IF_FALSE => !value.is_truthy(),
                    JUMP_IF_NOT_NIL => !value.is_nil(),
                    mode => return Err(VmError::new(format!("Invalid jump mode: {}", mode))),
                };
                if jump {
                    self.inc_pc(b.value)?;
                }
                Ok(ExecutionResult::Next)
            }

            OpCode::Return => self.exec_return(a),

            _ => unreachable!("Non-control opcode in control handler"),
        }
    }

    fn exec_return(&mut self, a: Address) -> Result<ExecutionResult, VmError> {
        if self.return_from_finally()? {
            return Ok(ExecutionResult::Continue);
        }

        let value = if a.is_void() { Value::Null } else { self.get(a)? };

        if self.frames.len() == 1 {
            self.ret_value = value;
            return Ok(ExecutionResult::Exit);
        }

        let Some(mut frame) = self.frames.pop() else {
            return Err(VmError::new("call stack is empty"));
        };
        trace!(function = frame.func, depth = self.frames.len(), "return");

        let finalizers = std::mem::take(&mut frame.finalizers);
        let exit = frame.exit;
        self.cache.recycle(frame);
        run_finalizers(finalizers)?;

        if exit {
            self.ret_value = value;
            return Ok(ExecutionResult::Exit);
        }

        let ret = self.current_frame()?.ret_address;
        if !ret.is_void() {
            self.set(ret, value)?;
        }
        Ok(ExecutionResult::Continue)
    }
}
