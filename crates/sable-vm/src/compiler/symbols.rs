//! Name resolution

use super::context::Unresolved;
use super::{Compiler, GLOBAL_NAMESPACE};
use crate::bytecode::Address;
use crate::error::CompileError;
use sable_parser::Pos;

impl Compiler {
    /// Resolves `name` as seen from `func`. Returns `Address::VOID` when
    /// nothing with that name is declared yet.
    ///
    /// Lookup order: locals of `func`, locals of its enclosing functions
    /// (captured as closures), globals, enums, classes, functions, native
    /// functions, named imports and finally `declare global` names.
    pub(crate) fn find_register(&mut self, name: &str, func: usize, pos: Pos) -> Result<Address, CompileError> {
        if !self.program.functions[func].is_global {
            if let Some(addr) = self.find_local(name, func) {
                return Ok(addr);
            }

            let mut parent = self.infos[func].parent;
            while let Some(p) = parent {
                if self.program.functions[p].is_global {
                    break;
                }
                let pf = &self.program.functions[p];
                let pc = pf.instructions.len();
                let found = pf
                    .registers
                    .iter()
                    .enumerate()
                    .rev()
                    .find(|(_, r)| r.name == name && r.is_live(pc))
                    .map(|(i, r)| (i, r.k_address));

                if let Some((position, k)) = found {
                    if let Some(k) = k {
                        return Ok(k);
                    }
                    let index = self.mark_as_closure(p, position);
                    return Ok(Address::closure(index));
                }
                parent = self.infos[p].parent;
            }
        }

        let full = self.register_name(name);

        if let Some(addr) = self.find_global(&full, true) {
            return Ok(addr);
        }

        if let Some(addr) = self.find_type(&full, true) {
            return Ok(addr);
        }

        if let Some(&index) = self.functions.get(&full) {
            let f = &self.program.functions[index];
            if !name.contains('@') && f.module != self.module_prefix && !f.exported {
                return Err(self.error(format!("{} is not exported", name), pos));
            }
            return Ok(Address::function(index));
        }

        if !name.contains('.') {
            if let Some(native) = self.program.natives.find(name) {
                return Ok(Address::native(native.index));
            }

            // import { name } from "module"
            let imported = self
                .imports
                .iter()
                .find(|i| i.names.iter().any(|n| n == name))
                .map(|i| format!("{}.{}", i.abs_path, name));
            if let Some(qualified) = imported {
                return self.find_register(&qualified, 0, pos);
            }

            let gns = Self::global_namespace_name(name);
            if let Some(addr) = self.find_global(&gns, false) {
                return Ok(addr);
            }
            if let Some(addr) = self.find_type(&gns, false) {
                return Ok(addr);
            }
            if let Some(&index) = self.functions.get(&gns) {
                return Ok(Address::function(index));
            }
        }

        Ok(Address::VOID)
    }

    fn find_local(&self, name: &str, func: usize) -> Option<Address> {
        let f = &self.program.functions[func];
        let pc = f.instructions.len();
        f.registers
            .iter()
            .rev()
            .find(|r| r.name == name && r.is_live(pc))
            .map(|r| r.k_address.unwrap_or(Address::local(r.index)))
    }

    fn find_global(&self, full: &str, check_export: bool) -> Option<Address> {
        let g = &self.program.functions[0];
        let pc = g.instructions.len();
        g.registers
            .iter()
            .rev()
            .filter(|r| r.name == full && r.is_live(pc))
            .find(|r| !check_export || r.module == self.module_prefix || r.exported)
            .map(|r| r.k_address.unwrap_or(Address::global(r.index)))
    }

    /// Enums and classes.
    fn find_type(&self, full: &str, check_export: bool) -> Option<Address> {
        let visible = |module: &str, exported: bool| {
            !check_export || exported || module == self.module_prefix || module == GLOBAL_NAMESPACE
        };

        if let Some((i, _)) = self
            .program
            .enums
            .iter()
            .enumerate()
            .find(|(_, e)| e.name == full && visible(&e.module, e.exported))
        {
            return Some(Address::enumeration(i));
        }

        self.program
            .classes
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == full && visible(&c.module, c.exported))
            .map(|(i, _)| Address::class(i))
    }

    /// `alias.name` where `alias` names an import of the current file.
    pub(crate) fn find_module_register(&mut self, alias: &str, name: &str, pos: Pos) -> Result<Address, CompileError> {
        let path = match self.imports.iter().find(|i| i.local_name() == alias) {
            Some(i) => i.abs_path.clone(),
            None => return Ok(Address::VOID),
        };

        let qualified = format!("{}.{}", path, name);
        let addr = self.find_register(&qualified, 0, pos)?;
        if !addr.is_void() {
            return Ok(addr);
        }

        // not declared yet unless the alias is shadowed by a variable
        let local = self.find_register(alias, self.current, pos)?;
        if local.is_void() {
            return Ok(self.get_unresolved(&qualified, pos));
        }
        Ok(Address::VOID)
    }

    pub(crate) fn get_unresolved(&mut self, name: &str, pos: Pos) -> Address {
        self.unresolved.push(Unresolved {
            name: name.to_string(),
            module: self.module_prefix.clone(),
            file: self.current_file().to_string(),
            pos,
            pc: self.pc(),
            func: self.current,
        });
        Address::unresolved(self.unresolved.len() - 1)
    }
}
