//! Bytecode data model

mod address;
mod function;
mod program;

pub use address::{Address, AddressKind};
pub use function::{
    Class, EnumList, EnumValue, Field, Function, FunctionKind, Instruction, Position, Register,
};
pub use program::Program;
