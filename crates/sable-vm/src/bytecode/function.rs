//! Functions, classes and enums as they are stored in a [`Program`].
//!
//! [`Program`]: super::Program

use super::address::Address;
use crate::opcode::OpCode;
use std::fmt;

/// A single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub a: Address,
    pub b: Address,
    pub c: Address,
}

impl Instruction {
    pub fn new(opcode: OpCode, a: Address, b: Address, c: Address) -> Self {
        Self { opcode, a, b, c }
    }

    pub(crate) fn operands_mut(&mut self) -> [&mut Address; 3] {
        [&mut self.a, &mut self.b, &mut self.c]
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<15} {:>6} {:>6} {:>6}",
            self.opcode, self.a, self.b, self.c
        )
    }
}

/// Source position of an instruction. `file` indexes `Program::files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub file: usize,
    pub line: u32,
    pub column: u32,
}

/// A named register and the pc range where its name is visible.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub name: String,
    pub index: usize,
    pub start_pc: usize,
    /// First pc after the scope; `None` while it is still open.
    pub end_pc: Option<usize>,
    pub exported: bool,
    pub module: String,
    /// Set for constants folded into the pool: reads go straight to it.
    pub k_address: Option<Address>,
}

impl Register {
    /// True when the name is visible at `pc`, i.e. `pc` is in
    /// `[start_pc, end_pc)`.
    pub fn is_live(&self, pc: usize) -> bool {
        pc >= self.start_pc && self.end_pc.map_or(true, |end| pc < end)
    }

    pub fn new(name: &str, index: usize, start_pc: usize, module: &str) -> Self {
        Self {
            name: name.to_string(),
            index,
            start_pc,
            end_pc: None,
            exported: false,
            module: module.to_string(),
            k_address: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionKind {
    #[default]
    User,
    Init,
    Main,
    Global,
}

#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: String,
    pub module: String,
    pub index: usize,
    pub kind: FunctionKind,
    pub is_global: bool,
    pub anonymous: bool,
    /// Declared parameters, the variadic one included.
    pub arguments: usize,
    pub optional_arguments: usize,
    pub variadic: bool,
    pub exported: bool,
    pub is_class: bool,
    /// The class a method belongs to.
    pub class: Option<usize>,
    /// The class whose body lexically contains the function. Grants
    /// access to private members.
    pub wrap_class: Option<usize>,
    pub max_reg: usize,
    pub registers: Vec<Register>,
    /// Registers (as positions in `registers`) captured by nested closures.
    pub closures: Vec<usize>,
    pub instructions: Vec<Instruction>,
    pub positions: Vec<Position>,
    pub attributes: Vec<String>,
}

impl Function {
    pub fn new(name: &str, index: usize, kind: FunctionKind) -> Self {
        Self {
            name: name.to_string(),
            index,
            kind,
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.attributes, name)
    }

    /// Permissions granted by `// [permissions a b]` attributes.
    pub fn permissions(&self) -> Vec<String> {
        parse_permissions(&self.attributes)
    }

    pub fn has_permission(&self, name: &str) -> bool {
        let perms = self.permissions();
        perms.iter().any(|p| p == name || p == "trusted")
    }

    /// Register slots captured by nested closures.
    pub fn closure_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.closures.iter().map(|&r| self.registers[r].index)
    }
}

/// Value of the attribute `name`: empty for a bare `[name]`.
pub(crate) fn find_attribute<'a>(attributes: &'a [String], name: &str) -> Option<&'a str> {
    attributes.iter().find_map(|a| {
        let mut parts = a.splitn(2, ' ');
        match parts.next() {
            Some(n) if n == name => Some(parts.next().unwrap_or("").trim()),
            _ => None,
        }
    })
}

pub(crate) fn parse_permissions(attributes: &[String]) -> Vec<String> {
    attributes
        .iter()
        .filter_map(|a| a.strip_prefix("permissions"))
        .filter(|rest| rest.is_empty() || rest.starts_with(' '))
        .flat_map(|rest| rest.split_whitespace().map(str::to_string))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub exported: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Class {
    pub name: String,
    pub module: String,
    pub exported: bool,
    pub fields: Vec<Field>,
    /// Indexes of the method functions, the constructor included.
    pub functions: Vec<usize>,
    pub attributes: Vec<String>,
}

impl Class {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    /// Index of the value in the constant pool.
    pub k_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EnumList {
    pub name: String,
    pub module: String,
    pub exported: bool,
    pub values: Vec<EnumValue>,
}

impl EnumList {
    pub fn value_by_name(&self, name: &str) -> Option<(usize, &EnumValue)> {
        self.values.iter().enumerate().find(|(_, v)| v.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions() {
        let mut f = Function::new("handler", 1, FunctionKind::User);
        f.attributes = vec![
            "route /a".to_string(),
            "permissions http  fs".to_string(),
            "permissionsX nope".to_string(),
        ];
        assert_eq!(f.permissions(), vec!["http", "fs"]);
        assert!(f.has_permission("fs"));
        assert!(!f.has_permission("net"));
        assert_eq!(f.attribute("route"), Some("/a"));

        f.attributes = vec!["permissions trusted".to_string()];
        assert!(f.has_permission("anything"));
    }

    #[test]
    fn test_register_liveness_is_half_open() {
        let mut r = Register::new("a", 0, 2, "");
        assert!(!r.is_live(1));
        assert!(r.is_live(2));
        assert!(r.is_live(100));

        r.end_pc = Some(4);
        assert!(r.is_live(3));
        assert!(!r.is_live(4));

        r.end_pc = Some(2);
        assert!(!r.is_live(2));
    }

    #[test]
    fn test_instruction_display() {
        let i = Instruction::new(
            OpCode::Add,
            Address::local(0),
            Address::local(1),
            Address::constant(2),
        );
        assert_eq!(i.to_string(), "Add                 0L     1L     2K");
    }
}
