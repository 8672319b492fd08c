//! Variable references

use crate::bytecode::{Address, AddressKind};
use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::Pos;

impl Compiler {
    pub(crate) fn compile_ident(&mut self, name: &str, pos: Pos, dest: Address) -> Result<Address, CompileError> {
        let mut addr = self.find_register(name, self.current, pos)?;

        if addr.kind == AddressKind::Class {
            return Err(self.error("invalid value: Class", pos));
        }

        if addr.is_void() {
            let property = self
                .program
                .natives
                .find(&format!("->{}", name))
                .map(|n| n.index);

            if let Some(index) = property {
                let dest = self.dest_or_temp(dest);
                self.emit(OpCode::ReadNativeProperty, dest, Address::native(index), Address::VOID, pos);
                return Ok(dest);
            }

            addr = self.get_unresolved(name, pos);
        }

        Ok(self.move_to(dest, addr, pos))
    }
}
