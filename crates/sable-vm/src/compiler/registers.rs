//! Register allocation and scopes
//!
//! Registers are never reused: the index of a register is also its position
//! in `Function::registers`, and a name is visible from the pc where it was
//! declared up to, not including, the pc where its scope closed.

use super::context::ClosureRef;
use super::{Compiler, GLOBAL_NAMESPACE};
use crate::bytecode::{Address, AddressKind, Register};

impl Compiler {
    /// Name of a global declared in the module being compiled.
    pub(crate) fn register_name(&self, name: &str) -> String {
        if name.contains('.') || self.module_prefix.is_empty() {
            return name.to_string();
        }
        format!("{}.{}", self.module_prefix, name)
    }

    pub(crate) fn global_namespace_name(name: &str) -> String {
        format!("{}.{}", GLOBAL_NAMESPACE, name)
    }

    /// Declare a named register in the current function.
    pub(crate) fn new_register(&mut self, name: &str, exported: bool, k: Option<Address>) -> Address {
        let is_global = self.func().is_global;
        let name = if is_global {
            self.register_name(name)
        } else {
            name.to_string()
        };

        let pc = self.pc();
        let module = self.module_prefix.clone();
        let f = self.func_mut();
        let index = f.registers.len();

        let mut r = Register::new(&name, index, pc, &module);
        r.exported = exported;
        r.k_address = k;
        f.registers.push(r);
        f.max_reg = f.registers.len();

        match k {
            Some(k) => k,
            None if is_global => Address::global(index),
            None => Address::local(index),
        }
    }

    /// A register for intermediate values. `@` never collides with a name
    /// from source.
    pub(crate) fn new_temp_register(&mut self) -> Address {
        self.new_register("@", false, None)
    }

    pub(crate) fn open_scope(&mut self) {
        let top = self.func().registers.len();
        self.infos[self.current].scopes.push(top);
    }

    pub(crate) fn close_scope(&mut self) {
        let mark = self.infos[self.current].scopes.pop().unwrap_or(0);
        let end = self.pc();
        for r in self.func_mut().registers.iter_mut().skip(mark) {
            if r.end_pc.is_none() {
                r.end_pc = Some(end);
            }
        }
    }

    /// True when `name` is declared in the innermost open scope.
    pub(crate) fn is_in_scope(&self, name: &str) -> bool {
        let f = self.func();
        let name = if f.is_global {
            self.register_name(name)
        } else {
            name.to_string()
        };
        let mark = self.infos[self.current].scopes.last().copied().unwrap_or(0);
        let pc = self.pc();
        f.registers
            .iter()
            .skip(mark)
            .any(|r| r.name == name && r.end_pc.map_or(true, |end| pc < end))
    }

    /// Records that register `register` of `func` is captured by a nested
    /// function and returns a provisional closure index.
    pub(crate) fn mark_as_closure(&mut self, func: usize, register: usize) -> usize {
        let reference = ClosureRef { func, register };
        if let Some(i) = self.closures.iter().position(|c| *c == reference) {
            return i;
        }

        let f = &mut self.program.functions[func];
        if !f.closures.contains(&register) {
            f.closures.push(register);
        }
        self.closures.push(reference);
        self.closures.len() - 1
    }

    /// True when a function value for `func` must carry captured cells.
    pub(crate) fn needs_closure(&self, func: usize) -> bool {
        let mut next = Some(func);
        while let Some(i) = next {
            let f = &self.program.functions[i];
            if f.is_global {
                return false;
            }
            if !f.closures.is_empty() {
                return true;
            }
            next = self.infos[i].parent;
        }
        false
    }

    /// Rewrites the provisional closure indexes of every function nested in
    /// the top level function `top` into positions in the runtime cell list.
    ///
    /// A closure receives the cells of its enclosing closure followed by one
    /// cell per captured register of the function that creates it, so a
    /// captured register lands after the cells of all its ancestors.
    pub(crate) fn update_closure_indexes(&mut self, top: usize) {
        if self.closures.is_empty() {
            return;
        }

        let finals: Vec<i32> = self
            .closures
            .iter()
            .map(|c| {
                let mut base = 0;
                let mut parent = self.infos[c.func].parent;
                while let Some(p) = parent {
                    let pf = &self.program.functions[p];
                    if pf.is_global {
                        break;
                    }
                    base += pf.closures.len();
                    parent = self.infos[p].parent;
                }
                let own = &self.program.functions[c.func].closures;
                let offset = own.iter().position(|&r| r == c.register).unwrap_or(0);
                (base + offset) as i32
            })
            .collect();

        for f in self.program.functions.iter_mut().skip(top + 1) {
            for instr in f.instructions.iter_mut() {
                for op in instr.operands_mut() {
                    if op.kind == AddressKind::Closure {
                        if let Some(&index) = finals.get(op.index()) {
                            op.value = index;
                        }
                    }
                }
            }
        }
        self.closures.clear();
    }
}
