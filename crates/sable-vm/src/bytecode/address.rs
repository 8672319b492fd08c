//! Instruction operands

use std::fmt;

/// Where an operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressKind {
    #[default]
    Void,
    /// A register of the current frame.
    Local,
    /// A register of the global frame.
    Global,
    /// An entry of the constant pool.
    Constant,
    /// A captured variable of the running closure.
    Closure,
    Enum,
    Function,
    NativeFunction,
    Class,
    /// The value itself: a pc, a count or a small integer.
    Immediate,
    /// A reference the compiler resolves once every file is compiled.
    Unresolved,
}

impl AddressKind {
    fn suffix(&self) -> &'static str {
        match self {
            AddressKind::Void => "",
            AddressKind::Local => "L",
            AddressKind::Global => "G",
            AddressKind::Constant => "K",
            AddressKind::Closure => "C",
            AddressKind::Enum => "E",
            AddressKind::Function => "F",
            AddressKind::NativeFunction => "N",
            AddressKind::Class => "A",
            AddressKind::Immediate => "I",
            AddressKind::Unresolved => "U",
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address {
    pub kind: AddressKind,
    pub value: i32,
}

impl Address {
    pub const VOID: Address = Address {
        kind: AddressKind::Void,
        value: 0,
    };

    pub const fn new(kind: AddressKind, value: i32) -> Self {
        Address { kind, value }
    }

    pub const fn local(index: usize) -> Self {
        Address::new(AddressKind::Local, index as i32)
    }

    pub const fn global(index: usize) -> Self {
        Address::new(AddressKind::Global, index as i32)
    }

    pub const fn constant(index: usize) -> Self {
        Address::new(AddressKind::Constant, index as i32)
    }

    pub const fn closure(index: usize) -> Self {
        Address::new(AddressKind::Closure, index as i32)
    }

    pub const fn function(index: usize) -> Self {
        Address::new(AddressKind::Function, index as i32)
    }

    pub const fn native(index: usize) -> Self {
        Address::new(AddressKind::NativeFunction, index as i32)
    }

    pub const fn enumeration(index: usize) -> Self {
        Address::new(AddressKind::Enum, index as i32)
    }

    pub const fn class(index: usize) -> Self {
        Address::new(AddressKind::Class, index as i32)
    }

    pub const fn imm(value: i32) -> Self {
        Address::new(AddressKind::Immediate, value)
    }

    pub const fn unresolved(index: usize) -> Self {
        Address::new(AddressKind::Unresolved, index as i32)
    }

    pub fn is_void(&self) -> bool {
        self.kind == AddressKind::Void
    }

    /// True when the operand names a register slot.
    pub fn is_register(&self) -> bool {
        matches!(
            self.kind,
            AddressKind::Local | AddressKind::Global | AddressKind::Closure
        )
    }

    pub fn index(&self) -> usize {
        self.value.max(0) as usize
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == AddressKind::Void {
            return f.pad("--");
        }
        f.pad(&format!("{}{}", self.value, self.kind.suffix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        assert_eq!(Address::VOID.to_string(), "--");
        assert_eq!(Address::local(3).to_string(), "3L");
        assert_eq!(Address::constant(0).to_string(), "0K");
        assert_eq!(Address::imm(-2).to_string(), "-2I");
        assert_eq!(format!("{:>6}", Address::global(12)), "   12G");
    }
}
