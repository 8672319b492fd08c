//! Literal compilation: constants, arrays and maps

use crate::bytecode::Address;
use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::{Expr, Literal, MapKey};
use sable_parser::Pos;
use sable_types::Value;

impl Compiler {
    pub(crate) fn compile_constant(&mut self, value: &Literal, pos: Pos, dest: Address) -> Result<Address, CompileError> {
        let k = self.add_literal(value);
        if dest.is_void() {
            return Ok(k);
        }
        self.emit(OpCode::LoadConstant, dest, k, Address::VOID, pos);
        Ok(dest)
    }

    pub(crate) fn compile_array(&mut self, items: &[Expr], pos: Pos, dest: Address) -> Result<Address, CompileError> {
        let dest = self.dest_or_temp(dest);
        self.emit(OpCode::NewArray, dest, Address::imm(items.len() as i32), Address::VOID, pos);

        for (i, item) in items.iter().enumerate() {
            let v = self.compile_expr(item, Address::VOID)?;
            self.emit(OpCode::SetIndexOrKey, dest, Address::imm(i as i32), v, item.pos());
        }
        Ok(dest)
    }

    pub(crate) fn compile_map(&mut self, entries: &[(MapKey, Expr)], pos: Pos, dest: Address) -> Result<Address, CompileError> {
        let dest = self.dest_or_temp(dest);
        self.emit(OpCode::NewMap, dest, Address::imm(entries.len() as i32), Address::VOID, pos);

        for (key, value) in entries {
            let k = match key {
                MapKey::Str(s) => self.add_string(s),
                MapKey::Int(n) => self.add_constant(Value::Int(*n)),
                MapKey::Expr(e) => self.compile_expr(e, Address::VOID)?,
            };
            let v = self.compile_expr(value, Address::VOID)?;
            self.emit(OpCode::SetIndexOrKey, dest, k, v, value.pos());
        }
        Ok(dest)
    }
}
