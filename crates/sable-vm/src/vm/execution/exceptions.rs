//! Exception instruction execution
//!
//! A `Try` pushes a region that records where its catch and finally blocks
//! start. Errors unwind the call stack down to the frame of the innermost
//! region that can still take them. A finally block reached because of an
//! error, a `return` or a `break` resumes that exit when it ends.

use crate::bytecode::Instruction;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::frame::TryCatch;
use crate::vm::result::ExecutionResult;
use crate::vm::Vm;
use sable_types::{Object, Value};
use tracing::{debug, warn};

impl Vm {
    /// Execute exception instructions
    pub(crate) fn execute_exceptions(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        let Instruction { opcode, a, b, c } = instr;

        match opcode {
            OpCode::Throw => {
                let err = match self.get(a)? {
                    // rethrown errors keep their original trace
                    Value::Object(Object::Error(e)) => VmError::Script(e),
                    other => VmError::new(other.to_string()),
                };
                Err(err)
            }

            OpCode::Try => {
                let catch_pc = (!a.is_void()).then_some(a.value as usize);
                let finally_pc = (!c.is_void()).then_some(c.value as usize);
                let fp = self.frames.len() - 1;
                self.tries.push(TryCatch::new(catch_pc, b, finally_pc, fp));
                Ok(ExecutionResult::Next)
            }

            OpCode::TryEnd | OpCode::CatchEnd => {
                self.tries.pop();
                Ok(ExecutionResult::Next)
            }

            OpCode::FinallyEnd => {
                let Some(t) = self.tries.pop() else {
                    return Ok(ExecutionResult::Next);
                };

                if let Some(err) = t.err {
                    self.inc_pc(1)?;
                    return Ok(if self.handle(err) {
                        ExecutionResult::Continue
                    } else {
                        ExecutionResult::Exit
                    });
                }

                match t.ret_pc {
                    Some(pc) => {
                        self.set_pc(pc)?;
                        Ok(ExecutionResult::Continue)
                    }
                    None => Ok(ExecutionResult::Next),
                }
            }

            // break or continue leaving a try block
            OpCode::TryExit => {
                let pc = self.current_frame()?.pc;
                let Some(t) = self.tries.last_mut() else {
                    return Ok(ExecutionResult::Next);
                };

                match t.finally_pc {
                    Some(finally) if pc < finally => {
                        t.ret_pc = Some(pc + 1);
                        t.catch_executed = true;
                        t.finally_executed = true;
                        self.set_pc(finally)?;
                        Ok(ExecutionResult::Continue)
                    }
                    _ => {
                        self.tries.pop();
                        Ok(ExecutionResult::Next)
                    }
                }
            }

            _ => unreachable!("Non-exception opcode in exception handler"),
        }
    }

    /// Routes an error to the innermost try region able to take it.
    /// Returns false, leaving the error in `self.error`, when none can.
    pub(crate) fn handle(&mut self, err: VmError) -> bool {
        loop {
            let Some(t) = self.tries.last() else {
                debug!(error = %err.message(), "unhandled error");
                self.error = Some(err);
                return false;
            };
            let fp = t.fp;

            // raised by the finally block itself
            let region_pc = self.frames.get(fp).map(|f| f.pc).unwrap_or(0);
            if t.finally_pc.is_some_and(|f| region_pc >= f) {
                self.tries.pop();
                continue;
            }

            let Some(t) = self.tries.last_mut() else {
                continue;
            };

            if t.catch_executed {
                match t.finally_pc {
                    Some(finally) if !t.finally_executed => {
                        t.err = Some(err);
                        t.finally_executed = true;
                        self.jump_to(fp, finally);
                        return true;
                    }
                    _ => {
                        self.tries.pop();
                        continue;
                    }
                }
            }

            t.catch_executed = true;
            let error_reg = t.error_reg;
            match (t.catch_pc, t.finally_pc) {
                (Some(catch), _) => {
                    self.jump_to(fp, catch);
                    if !error_reg.is_void() {
                        if let Err(e) = self.set(error_reg, Self::error_value(&err)) {
                            warn!(error = %e, "could not store the caught error");
                        }
                    }
                    return true;
                }
                (None, Some(finally)) => {
                    t.err = Some(err);
                    t.finally_executed = true;
                    self.jump_to(fp, finally);
                    return true;
                }
                (None, None) => {
                    self.tries.pop();
                }
            }
        }
    }

    /// Unwinds to frame `fp` and continues it at `pc`.
    fn jump_to(&mut self, fp: usize, pc: usize) {
        self.cleanup_frames(fp + 1);
        if let Some(frame) = self.frames.get_mut(fp) {
            frame.pc = pc;
        }
    }

    /// A `return` inside try regions of the returning frame first runs
    /// their finally blocks. True when the pc moved to one of them.
    pub(crate) fn return_from_finally(&mut self) -> Result<bool, VmError> {
        let fp = self.frames.len() - 1;
        let pc = self.current_frame()?.pc;

        while let Some(t) = self.tries.last_mut() {
            if t.fp != fp {
                break;
            }
            match t.finally_pc {
                Some(finally) if pc < finally => {
                    t.ret_pc = Some(pc);
                    t.catch_executed = true;
                    t.finally_executed = true;
                    self.set_pc(finally)?;
                    return Ok(true);
                }
                _ => {
                    self.tries.pop();
                }
            }
        }
        Ok(false)
    }
}
