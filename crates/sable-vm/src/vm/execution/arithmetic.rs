//! Arithmetic instruction execution

use crate::bytecode::Instruction;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::ops::ValueOperations;
use crate::vm::result::ExecutionResult;
use crate::vm::Vm;
use sable_types::Value;

impl Vm {
    /// Execute arithmetic instructions
    pub(crate) fn execute_arithmetic(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        let Instruction { opcode, a, b, c } = instr;

        match opcode {
            OpCode::Inc | OpCode::Dec => {
                let delta = if opcode == OpCode::Inc { 1 } else { -1 };
                let value = self.get(a)?;
                let result = ValueOperations::step_value(&value, delta)?;
                self.set(a, result)?;
                Ok(ExecutionResult::Next)
            }

            OpCode::Unm => {
                let value = self.get(b)?;
                let result = ValueOperations::neg_value(&value)?;
                self.set(a, result)?;
                Ok(ExecutionResult::Next)
            }

            OpCode::Not => {
                let value = self.get(b)?;
                self.set(a, Value::Bool(!value.is_truthy()))?;
                Ok(ExecutionResult::Next)
            }

            OpCode::BitwiseNot => {
                let value = self.get(b)?;
                let result = ValueOperations::bit_not_value(&value)?;
                self.set(a, result)?;
                Ok(ExecutionResult::Next)
            }

            _ => {
                let left = self.get(b)?;
                let right = self.get(c)?;
                let result = match opcode {
                    OpCode::Add => ValueOperations::add_values(&left, &right)?,
                    OpCode::Subtract => ValueOperations::sub_values(&left, &right)?,
                    OpCode::Multiply => ValueOperations::mul_values(&left, &right)?,
                    OpCode::Divide => ValueOperations::div_values(&left, &right)?,
                    OpCode::Modulo => ValueOperations::mod_values(&left, &right)?,
                    OpCode::Exponentiate => ValueOperations::pow_values(&left, &right)?,
                    OpCode::BinaryOr => ValueOperations::bitwise(&left, &right, |x, y| x | y)?,
                    OpCode::And => ValueOperations::bitwise(&left, &right, |x, y| x & y)?,
                    OpCode::Xor => ValueOperations::bitwise(&left, &right, |x, y| x ^ y)?,
                    OpCode::LeftShift => ValueOperations::bitwise(&left, &right, ValueOperations::shl)?,
                    OpCode::RightShift => ValueOperations::bitwise(&left, &right, ValueOperations::shr)?,
                    _ => unreachable!("Non-arithmetic opcode in arithmetic handler"),
                };
                self.set(a, result)?;
                Ok(ExecutionResult::Next)
            }
        }
    }
}
