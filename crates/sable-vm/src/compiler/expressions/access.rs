//! Member access: indexes, selectors, enums, modules, natives and `new`

use crate::bytecode::{Address, AddressKind};
use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::Expr;
use sable_parser::Pos;

impl Compiler {
    pub(crate) fn compile_index(
        &mut self,
        object: &Expr,
        index: &Expr,
        optional: bool,
        first: bool,
        pos: Pos,
        dest: Address,
    ) -> Result<Address, CompileError> {
        let opens = first || (optional && self.opt_chains.is_empty());
        if opens {
            self.open_opt_chain();
        }

        let x = self.compile_expr(object, Address::VOID)?;
        let i = self.compile_expr(index, Address::VOID)?;
        let dest = self.dest_or_temp(dest);

        if optional {
            self.add_opt_link(pos);
            self.emit(OpCode::GetOptChain, dest, x, i, pos);
        } else {
            self.emit(OpCode::GetIndexOrKey, dest, x, i, pos);
        }

        if opens {
            self.close_opt_chain(dest);
        }
        Ok(dest)
    }

    pub(crate) fn compile_selector(
        &mut self,
        object: &Expr,
        name: &str,
        optional: bool,
        first: bool,
        pos: Pos,
        dest: Address,
    ) -> Result<Address, CompileError> {
        let mut x = None;

        match object {
            Expr::Ident { name: ident, .. } => {
                let addr = self.find_register(ident, self.current, pos)?;
                if addr.kind == AddressKind::Enum {
                    return self.compile_enum_value(addr, name, dest, pos);
                }

                // a variable shadows modules and natives of the same name
                if !addr.is_register() && addr.kind != AddressKind::Constant {
                    if let Some(r) = self.compile_qualified(ident, name, pos, dest)? {
                        return Ok(r);
                    }

                    let builtin = self
                        .program
                        .natives
                        .find(&format!("->{}", ident))
                        .map(|n| n.index);
                    if let Some(index) = builtin {
                        let tmp = self.new_temp_register();
                        self.emit(OpCode::ReadNativeProperty, tmp, Address::native(index), Address::VOID, object.pos());
                        x = Some(tmp);
                    }
                }
            }
            // module.Enum.value
            Expr::Selector {
                object: inner,
                name: enum_name,
                optional: false,
                ..
            } => {
                if let Expr::Ident { name: alias, .. } = inner.as_ref() {
                    if self.imports.iter().any(|i| i.local_name() == *alias) {
                        let addr = self.find_module_register(alias, enum_name, pos)?;
                        if addr.kind == AddressKind::Enum {
                            return self.compile_enum_value(addr, name, dest, pos);
                        }
                    }
                }
            }
            _ => {}
        }

        let opens = first || (optional && self.opt_chains.is_empty());
        if opens {
            self.open_opt_chain();
        }

        let x = match x {
            Some(x) => x,
            None => self.compile_expr(object, Address::VOID)?,
        };
        let key = self.add_string(name);
        let dest = self.dest_or_temp(dest);

        if optional {
            self.add_opt_link(pos);
            self.emit(OpCode::GetOptChain, dest, x, key, pos);
        } else {
            self.emit(OpCode::GetIndexOrKey, dest, x, key, pos);
        }

        if opens {
            self.close_opt_chain(dest);
        }
        Ok(dest)
    }

    /// `alias.name` as a module member, a native function or a native
    /// property.
    fn compile_qualified(&mut self, alias: &str, name: &str, pos: Pos, dest: Address) -> Result<Option<Address>, CompileError> {
        let addr = self.find_module_register(alias, name, pos)?;
        if addr.kind == AddressKind::Class {
            return Err(self.error("invalid value: Class", pos));
        }
        if !addr.is_void() {
            return Ok(Some(self.move_to(dest, addr, pos)));
        }

        let qualified = format!("{}.{}", alias, name);
        let natives = &self.program.natives;
        let function = natives.find(&qualified).map(|n| n.index);
        let property = natives.find(&format!("->{}", qualified)).map(|n| n.index);

        if let Some(index) = function {
            return Ok(Some(self.move_to(dest, Address::native(index), pos)));
        }

        if let Some(index) = property {
            let dest = self.dest_or_temp(dest);
            self.emit(OpCode::ReadNativeProperty, dest, Address::native(index), Address::VOID, pos);
            return Ok(Some(dest));
        }

        Ok(None)
    }

    fn compile_enum_value(&mut self, enum_addr: Address, key: &str, dest: Address, pos: Pos) -> Result<Address, CompileError> {
        let list = &self.program.enums[enum_addr.index()];
        let index = match list.value_by_name(key) {
            Some((i, _)) => i,
            None => {
                let message = format!("Invalid enum key: {}.{}", list.name, key);
                return Err(self.error(message, pos));
            }
        };

        let dest = self.dest_or_temp(dest);
        self.emit(OpCode::GetEnumValue, dest, enum_addr, Address::imm(index as i32), pos);
        Ok(dest)
    }

    pub(crate) fn compile_new(
        &mut self,
        class: &Expr,
        args: &[Expr],
        spread: bool,
        pos: Pos,
        dest: Address,
    ) -> Result<Address, CompileError> {
        let class_addr = match class {
            Expr::Ident { name, .. } => {
                let addr = self.find_register(name, self.current, pos)?;
                if addr.is_void() {
                    self.get_unresolved(name, pos)
                } else {
                    addr
                }
            }
            Expr::Selector {
                object,
                name,
                optional: false,
                ..
            } => match object.as_ref() {
                Expr::Ident { name: alias, .. } => {
                    let addr = self.find_module_register(alias, name, pos)?;
                    if addr.is_void() {
                        return Err(self.error("Expected class name", pos));
                    }
                    addr
                }
                _ => return Err(self.error("Expected class name", pos)),
            },
            _ => return Err(self.error("Expected class name", pos)),
        };

        let dest = self.dest_or_temp(dest);

        if !spread && args.len() == 1 {
            let a = self.compile_expr(&args[0], Address::VOID)?;
            self.emit(OpCode::NewInstanceSingleArg, class_addr, dest, a, pos);
        } else {
            let a = self.compile_args(args, spread, pos)?;
            self.emit(OpCode::NewInstance, class_addr, dest, a, pos);
        }
        Ok(dest)
    }

    /// Packs call arguments into a new array. Void when there are none.
    pub(crate) fn compile_args(&mut self, args: &[Expr], spread: bool, pos: Pos) -> Result<Address, CompileError> {
        if args.is_empty() {
            return Ok(Address::VOID);
        }

        let arr = self.new_temp_register();
        self.emit(OpCode::NewArray, arr, Address::imm(args.len() as i32), Address::VOID, pos);
        for (i, arg) in args.iter().enumerate() {
            let v = self.compile_expr(arg, Address::VOID)?;
            self.emit(OpCode::SetIndexOrKey, arr, Address::imm(i as i32), v, arg.pos());
        }
        if spread {
            self.emit(OpCode::Spread, arr, Address::VOID, Address::VOID, pos);
        }
        Ok(arr)
    }
}
