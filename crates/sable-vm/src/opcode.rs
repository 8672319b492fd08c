//! OpCode definitions for the Sable VM
//!
//! Every instruction carries three operands (A, B, C), each an [`Address`]
//! that names where a value lives: a register, a constant, a global, a
//! closure cell or an immediate integer. Unless noted, A is the destination.
//!
//! [`Address`]: crate::bytecode::Address

use std::fmt;

/// Virtual machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // ===== Constants & Moves =====
    /// A = K[B]
    LoadConstant,
    /// A = B
    Move,
    /// A = B; C = truthiness of B
    MoveAndTest,
    /// Arms an optional chain: B is how far a short circuit jumps and C
    /// is the register that receives null when it does.
    SetRegister,

    // ===== Arithmetic =====
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponentiate,
    BinaryOr,
    And,
    Xor,
    LeftShift,
    RightShift,
    /// A++
    Inc,
    /// A--
    Dec,
    /// A = -B
    Unm,
    /// A = !B
    Not,
    /// A = ^B
    BitwiseNot,

    // ===== Objects & Collections =====
    /// B = new instance of class A with the args array C
    NewInstance,
    /// Same as `NewInstance` with C as the only argument.
    NewInstanceSingleArg,
    /// A = array of length B
    NewArray,
    /// A = map with capacity B
    NewMap,
    /// A = keys of B
    Keys,
    /// A = values of B
    Values,
    /// A = length of B
    Length,
    /// A = value C of enum B
    GetEnumValue,
    /// A = B[C]
    GetIndexOrKey,
    /// A = B?.[C]; jumps over the rest of the chain when B is nil.
    GetOptChain,
    /// A[B] = C
    SetIndexOrKey,
    /// Expands the last element of array A into A.
    Spread,
    /// delete A[B]
    DeleteProperty,

    // ===== Control Flow =====
    /// pc += A
    Jump,
    /// pc -= A
    JumpBack,
    /// if A == B then pc += C
    JumpIfEqual,
    /// if A != B then pc += C
    JumpIfNotEqual,
    /// Tests A and jumps B instructions. C selects the test: 0 jumps when
    /// truthy, 1 when falsy, 2 when not nil.
    TestJump,

    // ===== Comparison =====
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessOrEqual,

    // ===== Functions =====
    /// Call A with the args array C, result in B.
    Call,
    /// Like `Call` but short circuits when A is not callable.
    CallOptChain,
    /// Call A with C as the only argument, result in B.
    CallSingleArg,
    CallOptChainSingleArg,
    /// A = value of native property B
    ReadNativeProperty,
    /// Return A
    Return,
    /// A = closure over function B capturing the current frame.
    CreateClosure,

    // ===== Exceptions =====
    Throw,
    /// Push a handler. A: catch pc, B: error register, C: finally pc.
    Try,
    /// End of a try body when there is no finally.
    TryEnd,
    /// End of a catch body when there is no finally.
    CatchEnd,
    FinallyEnd,
    /// A break, continue or return leaving a try block.
    TryExit,
}

impl OpCode {
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::LoadConstant => "LoadConstant",
            OpCode::Move => "Move",
            OpCode::MoveAndTest => "MoveAndTest",
            OpCode::SetRegister => "SetRegister",
            OpCode::Add => "Add",
            OpCode::Subtract => "Subtract",
            OpCode::Multiply => "Multiply",
            OpCode::Divide => "Divide",
            OpCode::Modulo => "Modulo",
            OpCode::Exponentiate => "Exponentiate",
            OpCode::BinaryOr => "BinaryOr",
            OpCode::And => "And",
            OpCode::Xor => "Xor",
            OpCode::LeftShift => "LeftShift",
            OpCode::RightShift => "RightShift",
            OpCode::Inc => "Inc",
            OpCode::Dec => "Dec",
            OpCode::Unm => "Unm",
            OpCode::Not => "Not",
            OpCode::BitwiseNot => "BitwiseNot",
            OpCode::NewInstance => "NewInstance",
            OpCode::NewInstanceSingleArg => "NewInstanceSingleArg",
            OpCode::NewArray => "NewArray",
            OpCode::NewMap => "NewMap",
            OpCode::Keys => "Keys",
            OpCode::Values => "Values",
            OpCode::Length => "Length",
            OpCode::GetEnumValue => "GetEnumValue",
            OpCode::GetIndexOrKey => "GetIndexOrKey",
            OpCode::GetOptChain => "GetOptChain",
            OpCode::SetIndexOrKey => "SetIndexOrKey",
            OpCode::Spread => "Spread",
            OpCode::DeleteProperty => "DeleteProperty",
            OpCode::Jump => "Jump",
            OpCode::JumpBack => "JumpBack",
            OpCode::JumpIfEqual => "JumpIfEqual",
            OpCode::JumpIfNotEqual => "JumpIfNotEqual",
            OpCode::TestJump => "TestJump",
            OpCode::Equal => "Equal",
            OpCode::NotEqual => "NotEqual",
            OpCode::StrictEqual => "StrictEqual",
            OpCode::StrictNotEqual => "StrictNotEqual",
            OpCode::Less => "Less",
            OpCode::LessOrEqual => "LessOrEqual",
            OpCode::Call => "Call",
            OpCode::CallOptChain => "CallOptChain",
            OpCode::CallSingleArg => "CallSingleArg",
            OpCode::CallOptChainSingleArg => "CallOptChainSingleArg",
            OpCode::ReadNativeProperty => "ReadNativeProperty",
            OpCode::Return => "Return",
            OpCode::CreateClosure => "CreateClosure",
            OpCode::Throw => "Throw",
            OpCode::Try => "Try",
            OpCode::TryEnd => "TryEnd",
            OpCode::CatchEnd => "CatchEnd",
            OpCode::FinallyEnd => "FinallyEnd",
            OpCode::TryExit => "TryExit",
        }
    }

    /// True for the call family.
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            OpCode::Call
                | OpCode::CallOptChain
                | OpCode::CallSingleArg
                | OpCode::CallOptChainSingleArg
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width specifiers work in the disassembler
        f.pad(self.name())
    }
}
