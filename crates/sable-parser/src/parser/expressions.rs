use once_cell::sync::Lazy;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::parser::{pos_of, AstParser};
use crate::pest_parser::Rule;

/// Operator table, lowest precedence first.
static PRATT: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::op_nullish, Assoc::Left))
        .op(Op::infix(Rule::op_or, Assoc::Left))
        .op(Op::infix(Rule::op_and, Assoc::Left))
        .op(Op::infix(Rule::op_bitor, Assoc::Left))
        .op(Op::infix(Rule::op_bitxor, Assoc::Left))
        .op(Op::infix(Rule::op_bitand, Assoc::Left))
        .op(Op::infix(Rule::op_eq, Assoc::Left)
            | Op::infix(Rule::op_ne, Assoc::Left)
            | Op::infix(Rule::op_strict_eq, Assoc::Left)
            | Op::infix(Rule::op_strict_ne, Assoc::Left))
        .op(Op::infix(Rule::op_lt, Assoc::Left)
            | Op::infix(Rule::op_le, Assoc::Left)
            | Op::infix(Rule::op_gt, Assoc::Left)
            | Op::infix(Rule::op_ge, Assoc::Left))
        .op(Op::infix(Rule::op_shl, Assoc::Left) | Op::infix(Rule::op_shr, Assoc::Left))
        .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
        .op(Op::infix(Rule::op_mul, Assoc::Left)
            | Op::infix(Rule::op_div, Assoc::Left)
            | Op::infix(Rule::op_mod, Assoc::Left))
        .op(Op::infix(Rule::op_pow, Assoc::Right))
        .op(Op::prefix(Rule::op_not) | Op::prefix(Rule::op_neg) | Op::prefix(Rule::op_bitnot))
});

impl AstParser {
    /// Builds an `expr` (or `ternary`) pair.
    pub(super) fn build_expr(&mut self, pair: Pair<Rule>) -> Result<Expr, String> {
        match pair.as_rule() {
            Rule::expr => {
                let inner = pair.into_inner().next().ok_or("Empty expression")?;
                self.build_expr(inner)
            }
            Rule::ternary => {
                let pos = pos_of(&pair);
                let mut inner = pair.into_inner();
                let cond = self.build_binary(inner.next().ok_or("Missing expression")?)?;
                match (inner.next(), inner.next()) {
                    (Some(then), Some(otherwise)) => Ok(Expr::Ternary {
                        cond: Box::new(cond),
                        then: Box::new(self.build_expr(then)?),
                        otherwise: Box::new(self.build_expr(otherwise)?),
                        pos,
                    }),
                    _ => Ok(cond),
                }
            }
            Rule::binary => self.build_binary(pair),
            Rule::postfix_expr => self.build_postfix(pair),
            _ => self.build_primary(pair),
        }
    }

    fn build_binary(&mut self, pair: Pair<Rule>) -> Result<Expr, String> {
        PRATT
            .map_primary(|primary| self.build_postfix(primary))
            .map_prefix(|op, operand| {
                let pos = pos_of(&op);
                let op = match op.as_rule() {
                    Rule::op_not => UnaryOp::Not,
                    Rule::op_neg => UnaryOp::Neg,
                    Rule::op_bitnot => UnaryOp::BitNot,
                    r => return Err(format!("Unexpected prefix operator: {:?}", r)),
                };
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand?),
                    pos,
                })
            })
            .map_infix(|left, op, right| {
                let pos = pos_of(&op);
                let op = binary_op(op.as_rule())?;
                Ok(Expr::Binary {
                    op,
                    left: Box::new(left?),
                    right: Box::new(right?),
                    pos,
                })
            })
            .parse(pair.into_inner())
    }

    /// Builds a primary followed by member accesses, index operations and calls.
    pub(super) fn build_postfix(&mut self, pair: Pair<Rule>) -> Result<Expr, String> {
        let mut inner = pair.into_inner();
        let mut expr = self.build_primary(inner.next().ok_or("Missing primary expression")?)?;
        let mut has_optional = false;

        for op in inner {
            let pos = pos_of(&op);
            expr = match op.as_rule() {
                Rule::member_op | Rule::opt_member => {
                    let optional = op.as_rule() == Rule::opt_member;
                    has_optional |= optional;
                    let name = op.into_inner().next().ok_or("Missing property name")?;
                    Expr::Selector {
                        object: Box::new(expr),
                        name: name.as_str().to_string(),
                        optional,
                        first: false,
                        pos,
                    }
                }
                Rule::index_op | Rule::opt_index => {
                    let optional = op.as_rule() == Rule::opt_index;
                    has_optional |= optional;
                    let index = op.into_inner().next().ok_or("Missing index expression")?;
                    Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(self.build_expr(index)?),
                        optional,
                        first: false,
                        pos,
                    }
                }
                Rule::call_args | Rule::opt_call => {
                    let optional = op.as_rule() == Rule::opt_call;
                    has_optional |= optional;
                    let (args, spread) = self.build_args(op)?;
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                        spread,
                        optional,
                        first: false,
                        pos,
                    }
                }
                r => return Err(format!("Unexpected postfix rule: {:?}", r)),
            };
        }

        if has_optional {
            mark_chain_start(&mut expr);
        }
        Ok(expr)
    }

    /// Call arguments; only the last one may be spread.
    pub(super) fn build_args(&mut self, pair: Pair<Rule>) -> Result<(Vec<Expr>, bool), String> {
        let mut args = Vec::new();
        let mut spread = false;
        for arg in pair.into_inner() {
            if spread {
                return Err("A spread argument must be the last argument".to_string());
            }
            for p in arg.into_inner() {
                match p.as_rule() {
                    Rule::spread => spread = true,
                    _ => args.push(self.build_expr(p)?),
                }
            }
        }
        Ok((args, spread))
    }
}

fn mark_chain_start(expr: &mut Expr) {
    match expr {
        Expr::Index { first, .. } | Expr::Selector { first, .. } | Expr::Call { first, .. } => {
            *first = true
        }
        _ => {}
    }
}

fn binary_op(rule: Rule) -> Result<BinaryOp, String> {
    Ok(match rule {
        Rule::op_nullish => BinaryOp::Nullish,
        Rule::op_or => BinaryOp::Or,
        Rule::op_and => BinaryOp::And,
        Rule::op_bitor => BinaryOp::BitOr,
        Rule::op_bitxor => BinaryOp::BitXor,
        Rule::op_bitand => BinaryOp::BitAnd,
        Rule::op_eq => BinaryOp::Eq,
        Rule::op_ne => BinaryOp::NotEq,
        Rule::op_strict_eq => BinaryOp::StrictEq,
        Rule::op_strict_ne => BinaryOp::StrictNotEq,
        Rule::op_lt => BinaryOp::Less,
        Rule::op_le => BinaryOp::LessEq,
        Rule::op_gt => BinaryOp::Greater,
        Rule::op_ge => BinaryOp::GreaterEq,
        Rule::op_shl => BinaryOp::Shl,
        Rule::op_shr => BinaryOp::Shr,
        Rule::op_add => BinaryOp::Add,
        Rule::op_sub => BinaryOp::Sub,
        Rule::op_mul => BinaryOp::Mul,
        Rule::op_div => BinaryOp::Div,
        Rule::op_mod => BinaryOp::Mod,
        Rule::op_pow => BinaryOp::Pow,
        r => return Err(format!("Unexpected binary operator: {:?}", r)),
    })
}
