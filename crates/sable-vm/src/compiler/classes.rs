//! Class declarations
//!
//! Methods are compiled as top level functions flagged with their class.
//! Fields are initialized by the constructor, before its body runs; a class
//! with fields and no constructor gets one generated.

use super::context::FunctionInfo;
use super::Compiler;
use crate::bytecode::{Address, Class, Field, Function, FunctionKind};
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::{ClassDecl, Expr, FuncDecl, Literal};
use sable_parser::Pos;
use sable_types::Value;

pub(crate) const CONSTRUCTOR: &str = "constructor";

impl Compiler {
    pub(crate) fn compile_class(&mut self, decl: &ClassDecl) -> Result<(), CompileError> {
        let name = self.register_name(&decl.name);
        if self.program.classes.iter().any(|c| c.name == name) {
            return Err(self.error(format!("Redeclared class '{}'", name), decl.pos));
        }

        let index = self.program.classes.len();
        self.program.classes.push(Class {
            name,
            module: self.module_prefix.clone(),
            exported: decl.exported,
            fields: decl
                .fields
                .iter()
                .map(|f| Field {
                    name: f.name.clone(),
                    exported: !f.private,
                })
                .collect(),
            functions: Vec::new(),
            attributes: Vec::new(),
        });

        let saved = self.current;
        self.current = 0;
        self.closures.clear();
        self.current_class = Some(index);

        let mut has_constructor = false;
        for m in &decl.methods {
            if m.name == CONSTRUCTOR {
                self.compile_constructor(index, Some(m), decl)?;
                has_constructor = true;
                continue;
            }
            let f = self.compile_function(m, &m.name, Some(index), false)?;
            self.program.classes[index].functions.push(f);
        }

        if !has_constructor && !decl.fields.is_empty() {
            self.compile_constructor(index, None, decl)?;
        }

        self.current = saved;
        self.current_class = None;
        Ok(())
    }

    fn compile_constructor(&mut self, class: usize, decl: Option<&FuncDecl>, class_decl: &ClassDecl) -> Result<(), CompileError> {
        let index = self.program.functions.len();
        let mut f = Function::new(CONSTRUCTOR, index, FunctionKind::User);
        f.module = self.module_prefix.clone();
        f.is_class = true;
        f.class = Some(class);
        f.wrap_class = Some(class);
        f.exported = true;
        if let Some(d) = decl {
            f.arguments = d.params.len();
            f.optional_arguments = d.params.iter().filter(|p| p.optional).count();
            f.variadic = d.variadic;
            f.attributes = d.attributes.clone();
        }
        self.program.functions.push(f);
        self.program.classes[class].functions.push(index);

        self.infos.push(FunctionInfo {
            parent: Some(self.current),
            ..Default::default()
        });

        let parent = self.current;
        self.current = index;
        let branches = std::mem::take(&mut self.branches);

        self.open_scope();
        if let Some(d) = decl {
            for p in &d.params {
                self.new_register(&p.name, false, None);
            }
        }
        let this = self.new_register("this", false, None);

        for field in &class_decl.fields {
            let key = self.add_string(&field.name);
            let value = match &field.value {
                None
                | Some(Expr::Constant {
                    value: Literal::Undefined,
                    ..
                }) => self.add_constant(Value::Null),
                Some(e) => self.compile_expr(e, Address::VOID)?,
            };
            self.emit(OpCode::SetIndexOrKey, this, key, value, field.pos);
        }

        if let Some(d) = decl {
            for stmt in &d.body {
                self.compile_stmt(stmt)?;
            }
        }

        self.emit(OpCode::Return, Address::VOID, Address::VOID, Address::VOID, Pos::default());
        self.close_scope();

        self.current = parent;
        self.branches = branches;
        self.update_closure_indexes(index);
        Ok(())
    }
}
