//! Statement compilation

use super::Compiler;
use crate::bytecode::{Address, AddressKind, EnumList, EnumValue};
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::{BinaryOp, Block, EnumDecl, EnumInit, Expr, IncOp, Stmt, VarDecl};
use sable_parser::Pos;
use sable_types::Value;

impl Compiler {
    /// Compile a statement
    pub(crate) fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Var(decls) => {
                for decl in decls {
                    self.compile_var_decl(decl)?;
                }
                Ok(())
            }
            Stmt::Function(decl) => self.compile_func_stmt(decl),
            Stmt::Class(decl) => self.compile_class(decl),
            Stmt::Enum(decl) => self.compile_enum(decl),
            Stmt::Assign { target, value, pos } => self.compile_assign(target, value, *pos),
            Stmt::Inc { target, op, pos } => self.compile_inc(target, *op, *pos),
            Stmt::Expr(expr) => self.compile_expr_stmt(expr),
            Stmt::Return { value, pos } => self.compile_return(value.as_ref(), *pos),
            Stmt::Block(block) => self.compile_block(block),
            Stmt::If {
                branches,
                else_block,
                pos,
            } => self.compile_if(branches, else_block.as_ref(), *pos),
            Stmt::Switch(s) => self.compile_switch(s),
            Stmt::For(s) => self.compile_for(s),
            Stmt::While {
                label,
                cond,
                body,
                pos,
            } => self.compile_while(label.as_deref(), cond, body, *pos),
            Stmt::Throw { value, pos } => {
                let e = self.compile_expr(value, Address::VOID)?;
                self.emit(OpCode::Throw, e, Address::VOID, Address::VOID, *pos);
                Ok(())
            }
            Stmt::Try(t) => self.compile_try(t),
            Stmt::Break { label, pos } => self.compile_break(label.as_deref(), *pos),
            Stmt::Continue { label, pos } => self.compile_continue(label.as_deref(), *pos),
            Stmt::Delete {
                object,
                property,
                pos,
            } => self.compile_delete(object, property, *pos),
        }
    }

    /// A block in its own scope.
    pub(crate) fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.open_scope();
        for stmt in block {
            self.compile_stmt(stmt)?;
        }
        self.close_scope();
        Ok(())
    }

    fn compile_var_decl(&mut self, decl: &VarDecl) -> Result<(), CompileError> {
        if self.is_in_scope(&decl.name) {
            return Err(self.error(
                format!("Redeclared identifier in the same block: '{}'", decl.name),
                decl.pos,
            ));
        }

        // constants with a literal value never get a register
        if decl.is_const {
            if let Some(Expr::Constant { value, .. }) = &decl.value {
                let k = self.add_literal(value);
                self.new_register(&decl.name, decl.exported, Some(k));
                return Ok(());
            }
        }

        let r = self.new_register(&decl.name, decl.exported, None);
        match &decl.value {
            Some(value) => {
                self.compile_expr(value, r)?;
            }
            None => {
                // reset on every pass through a loop body
                let k = self.add_constant(Value::Null);
                self.emit(OpCode::LoadConstant, r, k, Address::VOID, decl.pos);
            }
        }
        Ok(())
    }

    fn compile_enum(&mut self, decl: &EnumDecl) -> Result<(), CompileError> {
        let mut list = EnumList {
            name: self.register_name(&decl.name),
            module: self.module_prefix.clone(),
            exported: decl.exported,
            values: Vec::with_capacity(decl.members.len()),
        };

        let mut next = 0i64;
        for m in &decl.members {
            let value = match &m.value {
                Some(EnumInit::Int(n)) => {
                    next = n.wrapping_add(1);
                    Value::Int(*n)
                }
                Some(EnumInit::Str(s)) => Value::from(s.as_str()),
                None => {
                    let n = next;
                    next = n.wrapping_add(1);
                    Value::Int(n)
                }
            };
            let k = self.add_constant(value);
            list.values.push(EnumValue {
                name: m.name.clone(),
                k_index: k.index(),
            });
        }

        self.program.enums.push(list);
        Ok(())
    }

    /// Expression statements discard their value.
    fn compile_expr_stmt(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Call {
                callee,
                args,
                spread,
                optional,
                first,
                pos,
            } => {
                self.compile_call(callee, args, *spread, *optional, *first, *pos, Address::VOID, false)?;
            }
            other => {
                self.compile_expr(other, Address::VOID)?;
            }
        }
        Ok(())
    }

    fn compile_assign(&mut self, target: &Expr, value: &Expr, pos: Pos) -> Result<(), CompileError> {
        match target {
            Expr::Ident { .. } => {
                let left = self.compile_expr(target, Address::VOID)?;
                match left.kind {
                    AddressKind::Constant => {
                        return Err(self.error("can't modify a constant", pos));
                    }
                    AddressKind::Local
                    | AddressKind::Global
                    | AddressKind::Closure
                    | AddressKind::Unresolved => {}
                    _ => return Err(self.error("Invalid assignment", pos)),
                }

                if writes_directly(value) {
                    self.compile_expr(value, left)?;
                } else {
                    // the right side may still read the old value
                    let v = self.compile_expr(value, Address::VOID)?;
                    if v != left {
                        self.emit(OpCode::Move, left, v, Address::VOID, pos);
                    }
                }
                Ok(())
            }
            Expr::Index { object, index, .. } => {
                let x = self.compile_expr(object, Address::VOID)?;
                let i = self.compile_expr(index, Address::VOID)?;
                let v = self.compile_expr(value, Address::VOID)?;
                self.emit(OpCode::SetIndexOrKey, x, i, v, pos);
                Ok(())
            }
            Expr::Selector { object, name, .. } => {
                let x = self.compile_expr(object, Address::VOID)?;
                let key = self.add_string(name);
                let v = self.compile_expr(value, Address::VOID)?;
                self.emit(OpCode::SetIndexOrKey, x, key, v, pos);
                Ok(())
            }
            _ => Err(self.error("Invalid assignment", pos)),
        }
    }

    fn compile_inc(&mut self, target: &Expr, op: IncOp, pos: Pos) -> Result<(), CompileError> {
        let opcode = match op {
            IncOp::Inc => OpCode::Inc,
            IncOp::Dec => OpCode::Dec,
        };

        let (x, key) = match target {
            Expr::Ident { .. } => {
                let r = self.compile_expr(target, Address::VOID)?;
                if r.kind == AddressKind::Constant {
                    return Err(self.error("can't modify a constant", pos));
                }
                self.emit(opcode, r, Address::VOID, Address::VOID, pos);
                return Ok(());
            }
            Expr::Index { object, index, .. } => {
                let x = self.compile_expr(object, Address::VOID)?;
                let i = self.compile_expr(index, Address::VOID)?;
                (x, i)
            }
            Expr::Selector { object, name, .. } => {
                let x = self.compile_expr(object, Address::VOID)?;
                (x, self.add_string(name))
            }
            _ => return Err(self.error("Invalid increment", pos)),
        };

        let tmp = self.new_temp_register();
        self.emit(OpCode::GetIndexOrKey, tmp, x, key, pos);
        self.emit(opcode, tmp, Address::VOID, Address::VOID, pos);
        self.emit(OpCode::SetIndexOrKey, x, key, tmp, pos);
        Ok(())
    }

    fn compile_return(&mut self, value: Option<&Expr>, pos: Pos) -> Result<(), CompileError> {
        let value = match value {
            Some(v) => v,
            None => {
                self.emit(OpCode::Return, Address::VOID, Address::VOID, Address::VOID, pos);
                return Ok(());
            }
        };

        if let Expr::Call { callee, args, .. } = value {
            if self.is_tail_call(value, pos)? {
                return self.compile_tail_call(args, callee.pos());
            }
        }

        let r = self.compile_expr(value, Address::VOID)?;
        self.emit(OpCode::Return, r, Address::VOID, Address::VOID, pos);
        Ok(())
    }

    /// `return f(...)` inside `f` itself, outside any try block.
    fn is_tail_call(&mut self, value: &Expr, pos: Pos) -> Result<bool, CompileError> {
        let name = match value {
            Expr::Call {
                callee,
                spread: false,
                optional: false,
                first: false,
                ..
            } => match callee.as_ref() {
                Expr::Ident { name, .. } => name,
                _ => return Ok(false),
            },
            _ => return Ok(false),
        };

        let f = self.func();
        if f.variadic || f.is_class || f.anonymous || f.is_global {
            return Ok(false);
        }
        if self.infos[self.current].self_name.as_deref() != Some(name.as_str()) {
            return Ok(false);
        }
        if self.in_try() {
            return Ok(false);
        }

        let addr = self.find_register(name, self.current, pos)?;
        Ok(addr == Address::function(self.current))
    }

    /// Moves the arguments into the parameter registers and jumps to the
    /// start of the function instead of pushing a frame.
    fn compile_tail_call(&mut self, args: &[Expr], pos: Pos) -> Result<(), CompileError> {
        let mut temps = Vec::with_capacity(args.len());
        for arg in args {
            let t = self.new_temp_register();
            self.compile_expr(arg, t)?;
            temps.push(t);
        }

        for i in 0..self.func().arguments {
            let src = temps.get(i).copied().unwrap_or(Address::VOID);
            self.emit(OpCode::Move, Address::local(i), src, Address::VOID, pos);
        }

        let pc = self.pc() as i32;
        self.emit(OpCode::JumpBack, Address::imm(pc), Address::VOID, Address::VOID, pos);
        Ok(())
    }

    fn compile_delete(&mut self, object: &Expr, property: &Expr, pos: Pos) -> Result<(), CompileError> {
        if let Expr::Ident { name, .. } = object {
            let addr = self.find_register(name, self.current, pos)?;
            if addr.kind == AddressKind::Class {
                return Err(self.error("can't delete a Class member", pos));
            }
        }

        let x = self.compile_expr(object, Address::VOID)?;
        let key = self.compile_expr(property, Address::VOID)?;
        self.emit(OpCode::DeleteProperty, x, key, Address::VOID, pos);
        Ok(())
    }
}

/// Expressions that read every operand before writing their destination.
fn writes_directly(value: &Expr) -> bool {
    match value {
        Expr::Constant { .. } | Expr::Ident { .. } | Expr::Unary { .. } | Expr::Function(_) => true,
        Expr::Binary { op, .. } => !matches!(op, BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish),
        Expr::Call { first, .. } => !first,
        _ => false,
    }
}
