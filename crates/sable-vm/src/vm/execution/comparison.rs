//! Comparison instruction execution

use crate::bytecode::Instruction;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::ops::ValueOperations;
use crate::vm::result::ExecutionResult;
use crate::vm::Vm;
use sable_types::Value;

impl Vm {
    /// Execute comparison instructions
    pub(crate) fn execute_comparison(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        let Instruction { opcode, a, b, c } = instr;
        let left = self.get(b)?;
        let right = self.get(c)?;

        let result = match opcode {
            OpCode::Equal => left.equals(&right),
            OpCode::NotEqual => !left.equals(&right),
            OpCode::StrictEqual => left.strict_equals(&right),
            OpCode::StrictNotEqual => !left.strict_equals(&right),
            OpCode::Less => ValueOperations::lt_values(&left, &right)?,
            OpCode::LessOrEqual => ValueOperations::le_values(&left, &right)?,
            _ => unreachable!("Non-comparison opcode in comparison handler"),
        };

        self.set(a, Value::Bool(result))?;
        Ok(ExecutionResult::Next)
    }
}
