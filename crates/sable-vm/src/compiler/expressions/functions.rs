//! Function declarations, lambdas and calls

use crate::bytecode::{Address, Function, FunctionKind};
use crate::compiler::context::FunctionInfo;
use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::{Expr, FuncDecl};
use sable_parser::Pos;

impl Compiler {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn compile_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        spread: bool,
        optional: bool,
        first: bool,
        pos: Pos,
        dest: Address,
        ret_val: bool,
    ) -> Result<Address, CompileError> {
        let opens = first || (optional && self.opt_chains.is_empty());
        if opens {
            self.open_opt_chain();
        }

        let f = self.compile_expr(callee, Address::VOID)?;
        let dest = if ret_val { self.dest_or_temp(dest) } else { dest };

        if !spread && args.len() == 1 {
            let a = self.compile_expr(&args[0], Address::VOID)?;
            let opcode = if optional {
                self.add_opt_link(pos);
                OpCode::CallOptChainSingleArg
            } else {
                OpCode::CallSingleArg
            };
            self.emit(opcode, f, dest, a, pos);
        } else {
            let a = self.compile_args(args, spread, pos)?;
            let opcode = if optional {
                self.add_opt_link(pos);
                OpCode::CallOptChain
            } else {
                OpCode::Call
            };
            self.emit(opcode, f, dest, a, pos);
        }

        if opens {
            self.close_opt_chain(dest);
        }
        Ok(dest)
    }

    /// `function (...) {}` and arrow functions used as values.
    pub(crate) fn compile_lambda(&mut self, decl: &FuncDecl, dest: Address) -> Result<Address, CompileError> {
        let index = self.program.functions.len();
        let name = format!("@lambda_{}", index);
        self.compile_function(decl, &name, None, true)?;

        if self.needs_closure(index) {
            let dest = self.dest_or_temp(dest);
            self.emit(OpCode::CreateClosure, dest, Address::function(index), Address::VOID, decl.pos);
            return Ok(dest);
        }

        Ok(self.move_to(dest, Address::function(index), decl.pos))
    }

    /// A function declaration statement.
    pub(crate) fn compile_func_stmt(&mut self, decl: &FuncDecl) -> Result<(), CompileError> {
        let index = self.compile_function(decl, &decl.name, None, false)?;

        // nested functions that capture variables are reached through a
        // local holding the closure
        if !self.func().is_global && self.needs_closure(index) {
            let r = self.new_register(&decl.name, false, None);
            self.emit(OpCode::CreateClosure, r, Address::function(index), Address::VOID, decl.pos);
        }
        Ok(())
    }

    /// Compiles the body of a function, method or lambda into a new entry
    /// of the program and returns its index.
    pub(crate) fn compile_function(
        &mut self,
        decl: &FuncDecl,
        name: &str,
        class: Option<usize>,
        anonymous: bool,
    ) -> Result<usize, CompileError> {
        let mut name = name.to_string();
        let mut kind = FunctionKind::User;

        if class.is_none() && !anonymous {
            match decl.name.as_str() {
                "init" => {
                    if !decl.params.is_empty() {
                        return Err(self.error("init functions can't receive arguments.", decl.pos));
                    }
                    if decl.exported {
                        return Err(self.error("init functions can't be exported.", decl.pos));
                    }
                    // several files may have one
                    name = "@init".to_string();
                    let registered = self.register_name(&name);
                    self.init_funcs.push(registered);
                    kind = FunctionKind::Init;
                }
                "main" => kind = FunctionKind::Main,
                _ => {}
            }
        }

        if class.is_none() {
            name = self.register_name(&name);
            if self.functions.contains_key(&name) {
                return Err(self.error(format!("Redeclared function '{}'", name), decl.pos));
            }
        }

        let index = self.program.functions.len();
        let mut f = Function::new(&name, index, kind);
        f.module = self.module_prefix.clone();
        f.anonymous = anonymous;
        f.arguments = decl.params.len();
        f.optional_arguments = decl.params.iter().filter(|p| p.optional).count();
        f.variadic = decl.variadic;
        f.exported = if class.is_some() { !decl.private } else { decl.exported };
        f.is_class = class.is_some();
        f.class = class;
        f.wrap_class = self.current_class;
        f.attributes = decl.attributes.clone();
        self.program.functions.push(f);

        self.infos.push(FunctionInfo {
            parent: Some(self.current),
            scopes: Vec::new(),
            self_name: (class.is_none() && !anonymous).then(|| decl.name.clone()),
        });

        if class.is_none() {
            self.functions.insert(name, index);
        }

        let parent = self.current;
        let top_level = self.program.functions[parent].is_global;
        if top_level {
            self.closures.clear();
        }
        self.current = index;

        let branches = std::mem::take(&mut self.branches);
        let chains = std::mem::take(&mut self.opt_chains);

        self.open_scope();
        // arguments are copied to the first registers on a call
        for p in &decl.params {
            self.new_register(&p.name, false, None);
        }
        if class.is_some() {
            self.new_register("this", false, None);
        }

        for stmt in &decl.body {
            self.compile_stmt(stmt)?;
        }

        self.emit(OpCode::Return, Address::VOID, Address::VOID, Address::VOID, Pos::default());
        self.close_scope();

        self.current = parent;
        self.branches = branches;
        self.opt_chains = chains;

        if top_level {
            self.update_closure_indexes(index);
        }
        Ok(index)
    }
}
