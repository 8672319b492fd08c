//! Register and constant instruction execution

use crate::bytecode::Instruction;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::Vm;
use sable_types::Value;

impl Vm {
    /// Execute register moves and constant loads
    pub(crate) fn execute_variables(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        let Instruction { opcode, a, b, c } = instr;

        match opcode {
            OpCode::LoadConstant | OpCode::Move => {
                let value = self.get(b)?;
                self.set(a, value)?;
                Ok(ExecutionResult::Next)
            }

            OpCode::MoveAndTest => {
                let value = self.get(b)?;
                let truthy = value.is_truthy();
                self.set(a, value)?;
                self.set(c, Value::Bool(truthy))?;
                Ok(ExecutionResult::Next)
            }

            // Arms the next optional link: B is the distance to the end of
            // the chain and C the register that receives null.
            OpCode::SetRegister => {
                self.opt_skip = b.value;
                self.opt_dest = c;
                Ok(ExecutionResult::Next)
            }

            OpCode::ReadNativeProperty => {
                let value = self.call_native(b.index(), &Value::Null, &[])?;
                self.set(a, value)?;
                Ok(ExecutionResult::Next)
            }

            _ => unreachable!("Non-variable opcode in variable handler"),
        }
    }
}
