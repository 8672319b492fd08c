use pest::iterators::Pair;

use crate::ast::{
    BinaryOp, Block, Case, ClassDecl, ClassField, EnumDecl, EnumInit, EnumMember, Expr, ForKind,
    ForStmt, FuncDecl, Import, IncOp, Literal, Param, Stmt, SwitchStmt, TryStmt, VarDecl,
};
use crate::parser::{is_type_rule, pos_of, AstParser};
use crate::pest_parser::Rule;

impl AstParser {
    pub(super) fn build_statement_inner(&mut self, inner: Pair<Rule>) -> Result<Option<Stmt>, String> {
        let stmt = match inner.as_rule() {
            Rule::type_decl => return Ok(None),
            Rule::import_stmt => return Err("import declarations are only allowed at the top level".to_string()),
            Rule::declare_global => return Err("declare global is only allowed at the top level".to_string()),
            Rule::function_decl => Stmt::Function(self.build_function_decl(inner)?),
            Rule::class_decl => Stmt::Class(self.build_class_decl(inner)?),
            Rule::enum_decl => Stmt::Enum(self.build_enum_decl(inner)?),
            Rule::var_decl => self.build_var_decl(inner)?,
            Rule::if_stmt => self.build_if_stmt(inner)?,
            Rule::for_stmt => self.build_for_stmt(inner, None)?,
            Rule::while_stmt => self.build_while_stmt(inner, None)?,
            Rule::switch_stmt => self.build_switch_stmt(inner, None)?,
            Rule::try_stmt => self.build_try_stmt(inner)?,
            Rule::throw_stmt => {
                let pos = pos_of(&inner);
                let value = inner.into_inner().next().ok_or("Missing value in throw")?;
                Stmt::Throw {
                    value: self.build_expr(value)?,
                    pos,
                }
            }
            Rule::return_stmt => {
                let pos = pos_of(&inner);
                let value = match inner.into_inner().next() {
                    Some(expr) => Some(self.build_expr(expr)?),
                    None => None,
                };
                Stmt::Return { value, pos }
            }
            Rule::break_stmt => {
                let pos = pos_of(&inner);
                let label = inner.into_inner().next().map(|p| p.as_str().to_string());
                Stmt::Break { label, pos }
            }
            Rule::continue_stmt => {
                let pos = pos_of(&inner);
                let label = inner.into_inner().next().map(|p| p.as_str().to_string());
                Stmt::Continue { label, pos }
            }
            Rule::delete_stmt => self.build_delete_stmt(inner)?,
            Rule::labeled_stmt => self.build_labeled_stmt(inner)?,
            Rule::block => Stmt::Block(self.build_block(inner)?),
            Rule::inc_stmt => self.build_inc_stmt(inner)?,
            Rule::assign_stmt => self.build_assign_stmt(inner)?,
            Rule::expr_stmt => {
                let expr = inner.into_inner().next().ok_or("Empty expression statement")?;
                Stmt::Expr(self.build_expr(expr)?)
            }
            _ => return Err(format!("Unexpected statement rule: {:?}", inner.as_rule())),
        };
        Ok(Some(stmt))
    }

    pub(super) fn build_block(&mut self, pair: Pair<Rule>) -> Result<Block, String> {
        let mut stmts = Vec::new();
        for s in pair.into_inner() {
            if let Some(stmt) = self.build_statement(s)? {
                stmts.push(stmt);
            }
        }
        Ok(stmts)
    }

    /// `stmt_body` is either a block or a single statement.
    fn build_body(&mut self, pair: Pair<Rule>) -> Result<Block, String> {
        let inner = pair.into_inner().next().ok_or("Missing body")?;
        match inner.as_rule() {
            Rule::block => self.build_block(inner),
            _ => Ok(self.build_statement(inner)?.into_iter().collect()),
        }
    }

    pub(super) fn build_import(&mut self, pair: Pair<Rule>) -> Result<Import, String> {
        let pos = pos_of(&pair);
        let mut alias = None;
        let mut names = Vec::new();
        let mut path = None;

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::import_clause => {
                    let clause = p.into_inner().next().ok_or("Empty import clause")?;
                    match clause.as_rule() {
                        Rule::import_all => {
                            let ident = clause.into_inner().next().ok_or("Missing import alias")?;
                            alias = Some(ident.as_str().to_string());
                        }
                        Rule::import_names => {
                            names = clause.into_inner().map(|i| i.as_str().to_string()).collect();
                        }
                        Rule::ident => alias = Some(clause.as_str().to_string()),
                        r => return Err(format!("Unexpected import rule: {:?}", r)),
                    }
                }
                _ => path = Some(self.build_string(p)?),
            }
        }

        Ok(Import {
            alias,
            names,
            path: path.ok_or("Missing module path in import")?,
            abs_path: String::new(),
            pos,
        })
    }

    pub(super) fn build_function_decl(&mut self, pair: Pair<Rule>) -> Result<FuncDecl, String> {
        let pos = pos_of(&pair);
        let attributes = self.take_attributes(pos.line);
        let mut func = FuncDecl {
            pos,
            attributes,
            ..FuncDecl::default()
        };

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::export_kw => func.exported = true,
                Rule::ident => func.name = p.as_str().to_string(),
                Rule::param_list => {
                    let (params, variadic) = self.build_params(p)?;
                    func.params = params;
                    func.variadic = variadic;
                }
                Rule::block => func.body = self.build_block(p)?,
                r if is_type_rule(r) => {}
                r => return Err(format!("Unexpected function rule: {:?}", r)),
            }
        }
        Ok(func)
    }

    pub(super) fn build_params(&mut self, pair: Pair<Rule>) -> Result<(Vec<Param>, bool), String> {
        let mut params = Vec::new();
        let mut variadic = false;
        let count = pair.clone().into_inner().count();

        for (i, param) in pair.into_inner().enumerate() {
            let mut name = None;
            let mut optional = false;
            for p in param.into_inner() {
                match p.as_rule() {
                    Rule::rest_marker => {
                        if i + 1 != count {
                            return Err("A rest parameter must be last in a parameter list".to_string());
                        }
                        variadic = true;
                    }
                    Rule::ident => name = Some(p.as_str().to_string()),
                    Rule::optional_marker => optional = true,
                    _ => {}
                }
            }
            let name = name.ok_or("Missing parameter name")?;
            if params.iter().any(|p: &Param| p.name == name) {
                return Err(format!("Duplicate parameter name '{}'", name));
            }
            params.push(Param { name, optional });
        }

        // a required parameter can't follow an optional one
        let mut seen_optional = false;
        for (i, p) in params.iter().enumerate() {
            if variadic && i + 1 == params.len() {
                break;
            }
            if p.optional {
                seen_optional = true;
            } else if seen_optional {
                return Err(format!("A required parameter '{}' cannot follow an optional one", p.name));
            }
        }

        Ok((params, variadic))
    }

    fn build_class_decl(&mut self, pair: Pair<Rule>) -> Result<ClassDecl, String> {
        let pos = pos_of(&pair);
        let mut class = ClassDecl {
            name: String::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            exported: false,
            pos,
        };

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::export_kw => class.exported = true,
                Rule::ident => class.name = p.as_str().to_string(),
                Rule::class_method => class.methods.push(self.build_class_method(p)?),
                Rule::class_field => class.fields.push(self.build_class_field(p)?),
                r if is_type_rule(r) => {}
                r => return Err(format!("Unexpected class rule: {:?}", r)),
            }
        }
        Ok(class)
    }

    fn build_class_method(&mut self, pair: Pair<Rule>) -> Result<FuncDecl, String> {
        let pos = pos_of(&pair);
        let attributes = self.take_attributes(pos.line);
        let mut func = FuncDecl {
            pos,
            attributes,
            ..FuncDecl::default()
        };

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::modifier => func.private = p.as_str() == "private",
                Rule::prop_name => func.name = p.as_str().to_string(),
                Rule::param_list => {
                    let (params, variadic) = self.build_params(p)?;
                    func.params = params;
                    func.variadic = variadic;
                }
                Rule::block => func.body = self.build_block(p)?,
                _ => {}
            }
        }
        Ok(func)
    }

    fn build_class_field(&mut self, pair: Pair<Rule>) -> Result<ClassField, String> {
        let pos = pos_of(&pair);
        let mut field = ClassField {
            name: String::new(),
            value: None,
            private: false,
            pos,
        };

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::modifier => field.private = p.as_str() == "private",
                Rule::prop_name => field.name = p.as_str().to_string(),
                Rule::expr => field.value = Some(self.build_expr(p)?),
                _ => {}
            }
        }
        Ok(field)
    }

    fn build_enum_decl(&mut self, pair: Pair<Rule>) -> Result<EnumDecl, String> {
        let pos = pos_of(&pair);
        let mut decl = EnumDecl {
            name: String::new(),
            members: Vec::new(),
            exported: false,
            pos,
        };

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::export_kw => decl.exported = true,
                Rule::ident => decl.name = p.as_str().to_string(),
                Rule::enum_member => {
                    let mut inner = p.into_inner();
                    let name = inner.next().ok_or("Missing enum member name")?.as_str().to_string();
                    if decl.members.iter().any(|m| m.name == name) {
                        return Err(format!("Duplicate enum member '{}'", name));
                    }
                    let value = match inner.next() {
                        Some(v) => Some(self.build_enum_value(v)?),
                        None => None,
                    };
                    decl.members.push(EnumMember { name, value });
                }
                r => return Err(format!("Unexpected enum rule: {:?}", r)),
            }
        }
        Ok(decl)
    }

    fn build_enum_value(&mut self, pair: Pair<Rule>) -> Result<EnumInit, String> {
        let mut negative = false;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::neg => negative = true,
                Rule::int_lit | Rule::hex_int => {
                    let v = parse_int(p.as_str())?;
                    return Ok(EnumInit::Int(if negative { -v } else { v }));
                }
                _ => return Ok(EnumInit::Str(self.build_string(p)?)),
            }
        }
        Err("Missing enum value".to_string())
    }

    fn build_var_decl(&mut self, pair: Pair<Rule>) -> Result<Stmt, String> {
        let mut exported = false;
        let mut is_const = false;
        let mut decls = Vec::new();

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::export_kw => exported = true,
                Rule::var_kind => is_const = p.as_str() == "const",
                Rule::declarator => {
                    let pos = pos_of(&p);
                    let mut name = String::new();
                    let mut value = None;
                    for d in p.into_inner() {
                        match d.as_rule() {
                            Rule::ident => name = d.as_str().to_string(),
                            Rule::expr => value = Some(self.build_expr(d)?),
                            _ => {}
                        }
                    }
                    decls.push(VarDecl {
                        name,
                        value,
                        is_const,
                        exported,
                        pos,
                    });
                }
                r => return Err(format!("Unexpected declaration rule: {:?}", r)),
            }
        }
        Ok(Stmt::Var(decls))
    }

    fn build_if_stmt(&mut self, pair: Pair<Rule>) -> Result<Stmt, String> {
        let pos = pos_of(&pair);
        let mut inner = pair.into_inner();
        let cond = self.build_expr(inner.next().ok_or("Missing if condition")?)?;
        let body = self.build_body(inner.next().ok_or("Missing if body")?)?;
        let mut branches = vec![(cond, body)];
        let mut else_block = None;

        for p in inner {
            match p.as_rule() {
                Rule::else_if => {
                    let mut parts = p.into_inner();
                    let cond = self.build_expr(parts.next().ok_or("Missing else if condition")?)?;
                    let body = self.build_body(parts.next().ok_or("Missing else if body")?)?;
                    branches.push((cond, body));
                }
                Rule::else_clause => {
                    let body = p.into_inner().next().ok_or("Missing else body")?;
                    else_block = Some(self.build_body(body)?);
                }
                r => return Err(format!("Unexpected if rule: {:?}", r)),
            }
        }

        Ok(Stmt::If {
            branches,
            else_block,
            pos,
        })
    }

    fn build_for_stmt(&mut self, pair: Pair<Rule>, label: Option<String>) -> Result<Stmt, String> {
        let pos = pos_of(&pair);
        let mut inner = pair.into_inner();
        let header = inner.next().ok_or("Missing for header")?;
        let body = self.build_body(inner.next().ok_or("Missing for body")?)?;

        let kind = match header.as_rule() {
            Rule::for_in_of => {
                let mut name = String::new();
                let mut is_of = false;
                let mut expr = None;
                for p in header.into_inner() {
                    match p.as_rule() {
                        Rule::ident => name = p.as_str().to_string(),
                        Rule::of_kw => is_of = true,
                        Rule::expr => expr = Some(self.build_expr(p)?),
                        _ => {}
                    }
                }
                let expr = expr.ok_or("Missing range expression")?;
                if is_of {
                    ForKind::Of { name, expr }
                } else {
                    ForKind::In { name, expr }
                }
            }
            Rule::for_classic => {
                let mut init = None;
                let mut cond = None;
                let mut step = None;
                for p in header.into_inner() {
                    let rule = p.as_rule();
                    let part = p.into_inner().next().ok_or("Empty for clause")?;
                    match rule {
                        Rule::for_init => init = self.build_statement_inner(part)?.map(Box::new),
                        Rule::for_cond => cond = Some(self.build_expr(part)?),
                        Rule::for_step => {
                            step = match part.as_rule() {
                                Rule::expr => Some(Box::new(Stmt::Expr(self.build_expr(part)?))),
                                _ => self.build_statement_inner(part)?.map(Box::new),
                            }
                        }
                        r => return Err(format!("Unexpected for rule: {:?}", r)),
                    }
                }
                ForKind::Step { init, cond, step }
            }
            r => return Err(format!("Unexpected for header: {:?}", r)),
        };

        Ok(Stmt::For(ForStmt {
            label,
            kind,
            body,
            pos,
        }))
    }

    fn build_while_stmt(&mut self, pair: Pair<Rule>, label: Option<String>) -> Result<Stmt, String> {
        let pos = pos_of(&pair);
        let mut inner = pair.into_inner();
        let cond = self.build_expr(inner.next().ok_or("Missing while condition")?)?;
        let body = self.build_body(inner.next().ok_or("Missing while body")?)?;
        Ok(Stmt::While {
            label,
            cond,
            body,
            pos,
        })
    }

    fn build_switch_stmt(&mut self, pair: Pair<Rule>, label: Option<String>) -> Result<Stmt, String> {
        let pos = pos_of(&pair);
        let mut inner = pair.into_inner();
        let value = self.build_expr(inner.next().ok_or("Missing switch value")?)?;
        let mut cases = Vec::new();
        let mut default = None;

        for p in inner {
            match p.as_rule() {
                Rule::case_clause => {
                    let case_pos = pos_of(&p);
                    let mut parts = p.into_inner();
                    let value = self.build_expr(parts.next().ok_or("Missing case value")?)?;
                    let stmts = self.build_block(parts.next().ok_or("Missing case body")?)?;
                    cases.push(Case {
                        value,
                        stmts,
                        pos: case_pos,
                    });
                }
                Rule::default_clause => {
                    if default.is_some() {
                        return Err("Multiple default clauses in switch".to_string());
                    }
                    let body = p.into_inner().next().ok_or("Missing default body")?;
                    default = Some(self.build_block(body)?);
                }
                r => return Err(format!("Unexpected switch rule: {:?}", r)),
            }
        }

        Ok(Stmt::Switch(SwitchStmt {
            label,
            value,
            cases,
            default,
            pos,
        }))
    }

    fn build_try_stmt(&mut self, pair: Pair<Rule>) -> Result<Stmt, String> {
        let pos = pos_of(&pair);
        let mut inner = pair.into_inner();
        let body = self.build_block(inner.next().ok_or("Missing try body")?)?;
        let mut catch_ident = None;
        let mut catch = None;
        let mut finally = None;

        for p in inner {
            match p.as_rule() {
                Rule::catch_clause => {
                    for c in p.into_inner() {
                        match c.as_rule() {
                            Rule::ident => catch_ident = Some(c.as_str().to_string()),
                            Rule::block => catch = Some(self.build_block(c)?),
                            _ => {}
                        }
                    }
                }
                Rule::finally_clause => {
                    let block = p.into_inner().next().ok_or("Missing finally body")?;
                    finally = Some(self.build_block(block)?);
                }
                r => return Err(format!("Unexpected try rule: {:?}", r)),
            }
        }

        if catch.is_none() && finally.is_none() {
            return Err("try requires a catch or finally clause".to_string());
        }

        Ok(Stmt::Try(TryStmt {
            body,
            catch_ident,
            catch,
            finally,
            pos,
        }))
    }

    fn build_delete_stmt(&mut self, pair: Pair<Rule>) -> Result<Stmt, String> {
        let pos = pos_of(&pair);
        let target = pair.into_inner().next().ok_or("Missing delete target")?;
        match self.build_postfix(target)? {
            Expr::Selector { object, name, pos: p, .. } => Ok(Stmt::Delete {
                object: *object,
                property: Expr::Constant {
                    value: Literal::Str(name),
                    pos: p,
                },
                pos,
            }),
            Expr::Index { object, index, .. } => Ok(Stmt::Delete {
                object: *object,
                property: *index,
                pos,
            }),
            _ => Err("delete expects a property access".to_string()),
        }
    }

    fn build_labeled_stmt(&mut self, pair: Pair<Rule>) -> Result<Stmt, String> {
        let mut inner = pair.into_inner();
        let label = Some(inner.next().ok_or("Missing label")?.as_str().to_string());
        let stmt = inner.next().ok_or("Missing labeled statement")?;
        match stmt.as_rule() {
            Rule::for_stmt => self.build_for_stmt(stmt, label),
            Rule::while_stmt => self.build_while_stmt(stmt, label),
            Rule::switch_stmt => self.build_switch_stmt(stmt, label),
            Rule::block => Ok(Stmt::Block(self.build_block(stmt)?)),
            r => Err(format!("Unexpected labeled rule: {:?}", r)),
        }
    }

    fn build_inc_stmt(&mut self, pair: Pair<Rule>) -> Result<Stmt, String> {
        let pos = pos_of(&pair);
        let mut op = IncOp::Inc;
        let mut target = None;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::inc_op => {
                    if p.as_str() == "--" {
                        op = IncOp::Dec;
                    }
                }
                _ => target = Some(self.build_postfix(p)?),
            }
        }
        let target = target.ok_or("Missing increment target")?;
        check_assignable(&target)?;
        Ok(Stmt::Inc { target, op, pos })
    }

    fn build_assign_stmt(&mut self, pair: Pair<Rule>) -> Result<Stmt, String> {
        let pos = pos_of(&pair);
        let mut inner = pair.into_inner();
        let target = self.build_postfix(inner.next().ok_or("Missing assignment target")?)?;
        check_assignable(&target)?;
        let op = inner.next().ok_or("Missing assignment operator")?;
        let value = self.build_expr(inner.next().ok_or("Missing assignment value")?)?;

        let compound = match op.as_str() {
            "=" => None,
            "+=" => Some(BinaryOp::Add),
            "-=" => Some(BinaryOp::Sub),
            "*=" => Some(BinaryOp::Mul),
            "/=" => Some(BinaryOp::Div),
            "%=" => Some(BinaryOp::Mod),
            other => return Err(format!("Unknown assignment operator: {}", other)),
        };

        let value = match compound {
            Some(op) => Expr::Binary {
                op,
                left: Box::new(target.clone()),
                right: Box::new(value),
                pos,
            },
            None => value,
        };

        Ok(Stmt::Assign { target, value, pos })
    }
}

fn check_assignable(target: &Expr) -> Result<(), String> {
    match target {
        Expr::Ident { .. }
        | Expr::Selector { optional: false, .. }
        | Expr::Index { optional: false, .. } => Ok(()),
        _ => Err("Invalid left-hand side in assignment".to_string()),
    }
}

/// Decimal, `0x` hex and leading-zero octal, `_` separators allowed.
pub(super) fn parse_int(text: &str) -> Result<i64, String> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let result = if let Some(hex) = clean.strip_prefix("0x").or_else(|| clean.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if clean.len() > 1 && clean.starts_with('0') && clean.chars().all(|c| ('0'..='7').contains(&c)) {
        i64::from_str_radix(&clean[1..], 8)
    } else {
        clean.parse::<i64>()
    };
    result.map_err(|e| format!("Invalid integer literal '{}': {}", text, e))
}
