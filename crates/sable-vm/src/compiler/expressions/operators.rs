//! Operator compilation

use crate::bytecode::Address;
use crate::compiler::control_flow::{JUMP_IF_FALSE, JUMP_IF_NOT_NIL, JUMP_IF_TRUE};
use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::{BinaryOp, Expr, Literal, UnaryOp};
use sable_parser::Pos;
use sable_types::Value;

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
    }
}

impl Compiler {
    pub(crate) fn compile_unary(&mut self, op: UnaryOp, operand: &Expr, pos: Pos, dest: Address) -> Result<Address, CompileError> {
        // fold literals
        if let Expr::Constant { value, .. } = operand {
            let folded = match (op, value) {
                (UnaryOp::Neg, Literal::Int(n)) => Value::Int(n.wrapping_neg()),
                (UnaryOp::BitNot, Literal::Int(n)) => Value::Int(!n),
                (UnaryOp::Neg, Literal::Float(f)) => Value::Float(-f),
                (UnaryOp::Not, Literal::Bool(b)) => Value::Bool(!b),
                _ => {
                    return Err(self.error(
                        format!("Invalid unary operator {}", unary_symbol(op)),
                        pos,
                    ))
                }
            };
            let k = self.add_constant(folded);
            if dest.is_void() {
                return Ok(k);
            }
            self.emit(OpCode::LoadConstant, dest, k, Address::VOID, pos);
            return Ok(dest);
        }

        let v = self.compile_expr(operand, Address::VOID)?;
        let dest = self.dest_or_temp(dest);
        let opcode = match op {
            UnaryOp::Neg => OpCode::Unm,
            UnaryOp::Not => OpCode::Not,
            UnaryOp::BitNot => OpCode::BitwiseNot,
        };
        self.emit(opcode, dest, v, Address::VOID, pos);
        Ok(dest)
    }

    pub(crate) fn compile_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        pos: Pos,
        dest: Address,
    ) -> Result<Address, CompileError> {
        match op {
            BinaryOp::And | BinaryOp::Or => return self.compile_logical(op, left, right, pos, dest),
            BinaryOp::Nullish => return self.compile_nullish(left, right, pos, dest),
            _ => {}
        }

        let l = self.compile_expr(left, Address::VOID)?;
        let r = self.compile_expr(right, Address::VOID)?;
        let dest = self.dest_or_temp(dest);

        let (opcode, a, b) = match op {
            BinaryOp::Add => (OpCode::Add, l, r),
            BinaryOp::Sub => (OpCode::Subtract, l, r),
            BinaryOp::Mul => (OpCode::Multiply, l, r),
            BinaryOp::Div => (OpCode::Divide, l, r),
            BinaryOp::Mod => (OpCode::Modulo, l, r),
            BinaryOp::Pow => (OpCode::Exponentiate, l, r),
            BinaryOp::BitOr => (OpCode::BinaryOr, l, r),
            BinaryOp::BitAnd => (OpCode::And, l, r),
            BinaryOp::BitXor => (OpCode::Xor, l, r),
            BinaryOp::Shl => (OpCode::LeftShift, l, r),
            BinaryOp::Shr => (OpCode::RightShift, l, r),
            BinaryOp::Eq => (OpCode::Equal, l, r),
            BinaryOp::NotEq => (OpCode::NotEqual, l, r),
            BinaryOp::StrictEq => (OpCode::StrictEqual, l, r),
            BinaryOp::StrictNotEq => (OpCode::StrictNotEqual, l, r),
            BinaryOp::Less => (OpCode::Less, l, r),
            BinaryOp::LessEq => (OpCode::LessOrEqual, l, r),
            // a > b is b < a
            BinaryOp::Greater => (OpCode::Less, r, l),
            BinaryOp::GreaterEq => (OpCode::LessOrEqual, r, l),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => {
                return Err(self.error(format!("Unknown operator {}", op.symbol()), pos))
            }
        };

        self.emit(opcode, dest, a, b, pos);
        Ok(dest)
    }

    /// `a && b` and `a || b` evaluate `b` only when needed and yield the
    /// operand that decided the result.
    fn compile_logical(&mut self, op: BinaryOp, left: &Expr, right: &Expr, pos: Pos, dest: Address) -> Result<Address, CompileError> {
        let dest = self.dest_or_temp(dest);
        let flag = self.new_temp_register();

        let l = self.compile_expr(left, Address::VOID)?;
        self.emit(OpCode::MoveAndTest, dest, l, flag, pos);

        let mode = if op == BinaryOp::And { JUMP_IF_FALSE } else { JUMP_IF_TRUE };
        let jump = self.emit(OpCode::TestJump, flag, Address::VOID, Address::imm(mode), pos);
        let start = self.pc();

        let r = self.compile_expr(right, Address::VOID)?;
        self.move_to(dest, r, pos);

        let len = (self.pc() - start) as i32;
        self.instr_mut(jump).b = Address::imm(len);
        Ok(dest)
    }

    fn compile_nullish(&mut self, left: &Expr, right: &Expr, pos: Pos, dest: Address) -> Result<Address, CompileError> {
        let dest = self.dest_or_temp(dest);

        let l = self.compile_expr(left, Address::VOID)?;
        self.move_to(dest, l, pos);

        let jump = self.emit(OpCode::TestJump, l, Address::VOID, Address::imm(JUMP_IF_NOT_NIL), pos);
        let start = self.pc();

        let r = self.compile_expr(right, Address::VOID)?;
        self.move_to(dest, r, pos);

        let len = (self.pc() - start) as i32;
        self.instr_mut(jump).b = Address::imm(len);
        Ok(dest)
    }

    pub(crate) fn compile_ternary(
        &mut self,
        cond: &Expr,
        then: &Expr,
        otherwise: &Expr,
        pos: Pos,
        dest: Address,
    ) -> Result<Address, CompileError> {
        let dest = self.dest_or_temp(dest);

        let c = self.compile_expr(cond, Address::VOID)?;
        let to_else = self.emit(OpCode::TestJump, c, Address::VOID, Address::imm(JUMP_IF_FALSE), pos);
        let then_start = self.pc();

        self.compile_expr(then, dest)?;
        let to_end = self.emit(OpCode::Jump, Address::VOID, Address::VOID, Address::VOID, pos);

        let else_start = self.pc();
        self.instr_mut(to_else).b = Address::imm((else_start - then_start) as i32);

        self.compile_expr(otherwise, dest)?;
        let len = (self.pc() - else_start) as i32;
        self.instr_mut(to_end).a = Address::imm(len);
        Ok(dest)
    }
}
