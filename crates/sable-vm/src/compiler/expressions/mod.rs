//! Expression compilation
//!
//! Every `compile_*` takes a destination. With `Address::VOID` the result
//! lands wherever is cheapest (a temp, or the operand itself for names and
//! constants) and that address is returned; otherwise it is written to
//! `dest`.

use super::Compiler;
use crate::bytecode::{Address, AddressKind};
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::Expr;
use sable_parser::Pos;

mod access;
mod functions;
mod literals;
mod operators;
mod variables;

impl Compiler {
    /// Compile an expression
    pub(crate) fn compile_expr(&mut self, expr: &Expr, dest: Address) -> Result<Address, CompileError> {
        if dest.kind == AddressKind::Constant {
            return Err(self.error("can't modify a constant", expr.pos()));
        }

        match expr {
            Expr::Constant { value, pos } => self.compile_constant(value, *pos, dest),
            Expr::Ident { name, pos } => self.compile_ident(name, *pos, dest),
            Expr::Unary { op, operand, pos } => self.compile_unary(*op, operand, *pos, dest),
            Expr::Binary {
                op,
                left,
                right,
                pos,
            } => self.compile_binary(*op, left, right, *pos, dest),
            Expr::Ternary {
                cond,
                then,
                otherwise,
                pos,
            } => self.compile_ternary(cond, then, otherwise, *pos, dest),
            Expr::Array { items, pos } => self.compile_array(items, *pos, dest),
            Expr::Map { entries, pos } => self.compile_map(entries, *pos, dest),
            Expr::Index {
                object,
                index,
                optional,
                first,
                pos,
            } => self.compile_index(object, index, *optional, *first, *pos, dest),
            Expr::Selector {
                object,
                name,
                optional,
                first,
                pos,
            } => self.compile_selector(object, name, *optional, *first, *pos, dest),
            Expr::Call {
                callee,
                args,
                spread,
                optional,
                first,
                pos,
            } => self.compile_call(callee, args, *spread, *optional, *first, *pos, dest, true),
            Expr::New {
                class,
                args,
                spread,
                pos,
            } => self.compile_new(class, args, *spread, *pos, dest),
            Expr::Function(decl) => self.compile_lambda(decl, dest),
        }
    }

    /// `dest`, or a new temp when it is void.
    pub(crate) fn dest_or_temp(&mut self, dest: Address) -> Address {
        if dest.is_void() {
            self.new_temp_register()
        } else {
            dest
        }
    }

    /// Moves `value` into `dest` unless `dest` is void. Returns where the
    /// value ended up.
    pub(crate) fn move_to(&mut self, dest: Address, value: Address, pos: Pos) -> Address {
        if dest.is_void() || dest == value {
            return value;
        }
        self.emit(OpCode::Move, dest, value, Address::VOID, pos);
        dest
    }

    // ===== Optional chains =====

    pub(crate) fn open_opt_chain(&mut self) {
        self.opt_chains.push(Vec::new());
    }

    /// Emitted right before a `?.` link. B holds the pc of the link until
    /// the chain closes.
    pub(crate) fn add_opt_link(&mut self, pos: Pos) {
        let link = self.pc() as i32 + 1;
        let pc = self.emit(OpCode::SetRegister, Address::VOID, Address::imm(link), Address::VOID, pos);
        if let Some(chain) = self.opt_chains.last_mut() {
            chain.push(pc);
        }
    }

    /// Points every link of the innermost chain past its end and at the
    /// register that receives null on a short circuit.
    pub(crate) fn close_opt_chain(&mut self, dest: Address) {
        let links = self.opt_chains.pop().unwrap_or_default();
        let end = self.pc() as i32;
        for pc in links {
            let instr = self.instr_mut(pc);
            instr.b = Address::imm(end - instr.b.value);
            instr.c = dest;
        }
    }
}
