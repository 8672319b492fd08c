//! Constant pool helpers

use super::Compiler;
use crate::bytecode::Address;
use sable_parser::ast::Literal;
use sable_types::Value;

/// The value of a literal.
pub(crate) fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::from(s.as_str()),
        Literal::Rune(c) => Value::Rune(*c),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
    }
}

impl Compiler {
    pub(crate) fn add_constant(&mut self, value: Value) -> Address {
        self.program.add_constant(value)
    }

    pub(crate) fn add_string(&mut self, s: &str) -> Address {
        self.program.add_constant(Value::from(s))
    }

    pub(crate) fn add_literal(&mut self, lit: &Literal) -> Address {
        self.program.add_constant(literal_value(lit))
    }
}
