use pest::iterators::Pair;

use crate::ast::{Expr, FuncDecl, Literal, MapKey, Stmt};
use crate::parser::statements::parse_int;
use crate::parser::{is_type_rule, pos_of, AstParser};
use crate::pest_parser::Rule;

impl AstParser {
    pub(super) fn build_primary(&mut self, pair: Pair<Rule>) -> Result<Expr, String> {
        let pos = pos_of(&pair);
        let constant = |value| Ok(Expr::Constant { value, pos });

        match pair.as_rule() {
            Rule::postfix_expr => self.build_postfix(pair),
            Rule::paren_expr => {
                let inner = pair.into_inner().next().ok_or("Empty parenthesized expression")?;
                self.build_expr(inner)
            }
            Rule::ident => Ok(Expr::Ident {
                name: pair.as_str().to_string(),
                pos,
            }),
            Rule::int_lit | Rule::hex_int => constant(Literal::Int(parse_int(pair.as_str())?)),
            Rule::float_lit => {
                let clean: String = pair.as_str().chars().filter(|c| *c != '_').collect();
                let value = clean
                    .parse::<f64>()
                    .map_err(|e| format!("Invalid float literal '{}': {}", pair.as_str(), e))?;
                constant(Literal::Float(value))
            }
            Rule::string_sq => {
                let s = self.build_string(pair)?;
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => constant(Literal::Rune(c)),
                    _ => constant(Literal::Str(s)),
                }
            }
            Rule::string_dq | Rule::string_bt => constant(Literal::Str(self.build_string(pair)?)),
            Rule::true_lit => constant(Literal::Bool(true)),
            Rule::false_lit => constant(Literal::Bool(false)),
            Rule::null_lit => constant(Literal::Null),
            Rule::undefined_lit => constant(Literal::Undefined),
            Rule::array_lit => {
                let items = pair
                    .into_inner()
                    .map(|p| self.build_expr(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Array { items, pos })
            }
            Rule::map_lit => self.build_map(pair),
            Rule::arrow_fn => self.build_arrow_fn(pair),
            Rule::function_expr => self.build_function_expr(pair),
            Rule::new_expr => self.build_new(pair),
            _ => Err(format!("Unexpected primary rule: {:?}", pair.as_rule())),
        }
    }

    fn build_map(&mut self, pair: Pair<Rule>) -> Result<Expr, String> {
        let pos = pos_of(&pair);
        let mut entries = Vec::new();

        for entry in pair.into_inner() {
            let mut inner = entry.into_inner();
            let key = inner.next().ok_or("Missing map key")?;
            let key_pos = pos_of(&key);

            let (key, value) = match key.as_rule() {
                // shorthand `{ a }`
                Rule::ident => {
                    let name = key.as_str().to_string();
                    let value = Expr::Ident {
                        name: name.clone(),
                        pos: key_pos,
                    };
                    (MapKey::Str(name), value)
                }
                Rule::computed_key => {
                    let expr = key.into_inner().next().ok_or("Missing computed key")?;
                    let key = MapKey::Expr(self.build_expr(expr)?);
                    let value = self.build_expr(inner.next().ok_or("Missing map value")?)?;
                    (key, value)
                }
                Rule::map_key => {
                    let k = key.into_inner().next().ok_or("Missing map key")?;
                    let key = match k.as_rule() {
                        Rule::prop_name => MapKey::Str(k.as_str().to_string()),
                        Rule::int_lit => MapKey::Int(parse_int(k.as_str())?),
                        _ => MapKey::Str(self.build_string(k)?),
                    };
                    let value = self.build_expr(inner.next().ok_or("Missing map value")?)?;
                    (key, value)
                }
                r => return Err(format!("Unexpected map key rule: {:?}", r)),
            };
            entries.push((key, value));
        }

        Ok(Expr::Map { entries, pos })
    }

    fn build_arrow_fn(&mut self, pair: Pair<Rule>) -> Result<Expr, String> {
        let pos = pos_of(&pair);
        let mut func = FuncDecl {
            pos,
            ..FuncDecl::default()
        };

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::param_list => {
                    let (params, variadic) = self.build_params(p)?;
                    func.params = params;
                    func.variadic = variadic;
                }
                Rule::ident => {
                    func.params = vec![crate::ast::Param {
                        name: p.as_str().to_string(),
                        optional: false,
                    }]
                }
                Rule::block => func.body = self.build_block(p)?,
                Rule::expr => {
                    let value = self.build_expr(p)?;
                    func.body = vec![Stmt::Return {
                        pos: value.pos(),
                        value: Some(value),
                    }];
                }
                r if is_type_rule(r) => {}
                r => return Err(format!("Unexpected arrow function rule: {:?}", r)),
            }
        }

        Ok(Expr::Function(Box::new(func)))
    }

    fn build_function_expr(&mut self, pair: Pair<Rule>) -> Result<Expr, String> {
        let pos = pos_of(&pair);
        let mut func = FuncDecl {
            pos,
            ..FuncDecl::default()
        };

        for p in pair.into_inner() {
            match p.as_rule() {
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

        Ok(Expr::Function(Box::new(func)))
    }

    fn build_new(&mut self, pair: Pair<Rule>) -> Result<Expr, String> {
        let pos = pos_of(&pair);
        let mut class: Option<Expr> = None;
        let mut args = Vec::new();
        let mut spread = false;

        for p in pair.into_inner() {
            let p_pos = pos_of(&p);
            match p.as_rule() {
                Rule::ident => {
                    class = Some(Expr::Ident {
                        name: p.as_str().to_string(),
                        pos: p_pos,
                    })
                }
                Rule::prop_name => {
                    let object = class.take().ok_or("Missing class name")?;
                    class = Some(Expr::Selector {
                        object: Box::new(object),
                        name: p.as_str().to_string(),
                        optional: false,
                        first: false,
                        pos: p_pos,
                    });
                }
                Rule::call_args => (args, spread) = self.build_args(p)?,
                r if is_type_rule(r) => {}
                r => return Err(format!("Unexpected new rule: {:?}", r)),
            }
        }

        Ok(Expr::New {
            class: Box::new(class.ok_or("Missing class name in new expression")?),
            args,
            spread,
            pos,
        })
    }

    /// Unquotes a string literal pair and resolves its escape sequences.
    pub(super) fn build_string(&mut self, pair: Pair<Rule>) -> Result<String, String> {
        let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
        unescape(raw)
    }
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars.next().ok_or("Unterminated escape sequence")?;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' | '"' | '\'' | '`' => out.push(escaped),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| format!("Invalid escape sequence \\x{}", hex))?;
                out.push(char::from_u32(code).ok_or("Invalid character code")?);
            }
            'u' => {
                let hex: String = if chars.clone().next() == Some('{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| format!("Invalid unicode escape \\u{}", hex))?;
                out.push(char::from_u32(code).ok_or("Invalid character code")?);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}
