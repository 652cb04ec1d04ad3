//! The fixed dispatch table.
//!
//! Opcode numbers are positions in [`OPCODES`]; the set is closed at build
//! time so every dispatch site can `match` exhaustively.

use once_cell::sync::Lazy;

use crate::util::fast_map::{FastHashMap, fast_hash_map_with_capacity};

use super::bytecode::{CallOperand, DoWhileOperand, LoopNOperand};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    ReadMemory = 0,
    Call = 1,
    LoopN = 2,
    DoWhile = 3,
    Debug = 4,
    Context = 5,
    BlockNumber = 6,
    Timestamp = 7,
    Caller = 8,
    ThisAddress = 9,
    Erc20BalanceOf = 10,
    Erc20TotalSupply = 11,
    Add = 12,
    Sub = 13,
    Mul = 14,
    Div = 15,
    Mod = 16,
    Exp = 17,
    Min = 18,
    Max = 19,
    SaturatingAdd = 20,
    SaturatingSub = 21,
    SaturatingMul = 22,
    IsZero = 23,
    EqualTo = 24,
    LessThan = 25,
    GreaterThan = 26,
    Every = 27,
    Any = 28,
    EagerIf = 29,
    Ensure = 30,
}

pub const DISPATCH_TABLE_SIZE: usize = 31;

pub const OPCODES: [Opcode; DISPATCH_TABLE_SIZE] = [
    Opcode::ReadMemory,
    Opcode::Call,
    Opcode::LoopN,
    Opcode::DoWhile,
    Opcode::Debug,
    Opcode::Context,
    Opcode::BlockNumber,
    Opcode::Timestamp,
    Opcode::Caller,
    Opcode::ThisAddress,
    Opcode::Erc20BalanceOf,
    Opcode::Erc20TotalSupply,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Mod,
    Opcode::Exp,
    Opcode::Min,
    Opcode::Max,
    Opcode::SaturatingAdd,
    Opcode::SaturatingSub,
    Opcode::SaturatingMul,
    Opcode::IsZero,
    Opcode::EqualTo,
    Opcode::LessThan,
    Opcode::GreaterThan,
    Opcode::Every,
    Opcode::Any,
    Opcode::EagerIf,
    Opcode::Ensure,
];

/// How an opcode reads its 16-bit operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    Memory,
    Call,
    LoopN,
    DoWhile,
    Context,
    DebugMode,
    /// Operand is the input count, at least `min`.
    Inputs { min: u16 },
}

/// Words popped from and pushed onto the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    pub inputs: usize,
    pub outputs: usize,
}

impl StackEffect {
    const fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }
}

static BY_NAME: Lazy<FastHashMap<&'static str, Opcode>> = Lazy::new(|| {
    let mut map = fast_hash_map_with_capacity(DISPATCH_TABLE_SIZE);
    for op in OPCODES {
        map.insert(op.name(), op);
    }
    map
});

impl Opcode {
    #[inline]
    pub fn from_index(index: u16) -> Option<Opcode> {
        OPCODES.get(index as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Opcode> {
        BY_NAME.get(name).copied()
    }

    #[inline]
    pub const fn index(self) -> u16 {
        self as u16
    }

    pub const fn name(self) -> &'static str {
        match self {
            Opcode::ReadMemory => "read-memory",
            Opcode::Call => "call",
            Opcode::LoopN => "loop-n",
            Opcode::DoWhile => "do-while",
            Opcode::Debug => "debug",
            Opcode::Context => "context",
            Opcode::BlockNumber => "block-number",
            Opcode::Timestamp => "timestamp",
            Opcode::Caller => "caller",
            Opcode::ThisAddress => "this-address",
            Opcode::Erc20BalanceOf => "erc20-balance-of",
            Opcode::Erc20TotalSupply => "erc20-total-supply",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Exp => "exp",
            Opcode::Min => "min",
            Opcode::Max => "max",
            Opcode::SaturatingAdd => "saturating-add",
            Opcode::SaturatingSub => "saturating-sub",
            Opcode::SaturatingMul => "saturating-mul",
            Opcode::IsZero => "is-zero",
            Opcode::EqualTo => "equal-to",
            Opcode::LessThan => "less-than",
            Opcode::GreaterThan => "greater-than",
            Opcode::Every => "every",
            Opcode::Any => "any",
            Opcode::EagerIf => "eager-if",
            Opcode::Ensure => "ensure",
        }
    }

    pub const fn operand_kind(self) -> OperandKind {
        match self {
            Opcode::ReadMemory => OperandKind::Memory,
            Opcode::Call => OperandKind::Call,
            Opcode::LoopN => OperandKind::LoopN,
            Opcode::DoWhile => OperandKind::DoWhile,
            Opcode::Debug => OperandKind::DebugMode,
            Opcode::Context => OperandKind::Context,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Exp
            | Opcode::Min
            | Opcode::Max
            | Opcode::SaturatingAdd
            | Opcode::SaturatingSub
            | Opcode::SaturatingMul
            | Opcode::Every
            | Opcode::Any => OperandKind::Inputs { min: 2 },
            Opcode::Ensure => OperandKind::Inputs { min: 1 },
            Opcode::BlockNumber
            | Opcode::Timestamp
            | Opcode::Caller
            | Opcode::ThisAddress
            | Opcode::Erc20BalanceOf
            | Opcode::Erc20TotalSupply
            | Opcode::IsZero
            | Opcode::EqualTo
            | Opcode::LessThan
            | Opcode::GreaterThan
            | Opcode::EagerIf => OperandKind::None,
        }
    }

    /// Stack effect for a given operand. Operands are assumed to have passed
    /// load-time validation.
    pub fn stack_effect(self, operand: u16) -> StackEffect {
        match self {
            Opcode::ReadMemory | Opcode::Context => StackEffect::new(0, 1),
            Opcode::BlockNumber | Opcode::Timestamp | Opcode::Caller | Opcode::ThisAddress => StackEffect::new(0, 1),
            Opcode::Debug => StackEffect::new(0, 0),
            Opcode::Call => {
                let call = CallOperand::decode(operand);
                StackEffect::new(call.inputs as usize, call.outputs as usize)
            }
            Opcode::LoopN => {
                let lp = LoopNOperand::decode(operand);
                StackEffect::new(lp.inputs as usize, lp.outputs as usize)
            }
            Opcode::DoWhile => {
                let dw = DoWhileOperand::decode(operand);
                StackEffect::new(dw.inputs as usize + 1, dw.inputs as usize)
            }
            Opcode::Erc20BalanceOf | Opcode::EqualTo | Opcode::LessThan | Opcode::GreaterThan => {
                StackEffect::new(2, 1)
            }
            Opcode::Erc20TotalSupply | Opcode::IsZero => StackEffect::new(1, 1),
            Opcode::EagerIf => StackEffect::new(3, 1),
            Opcode::Ensure => StackEffect::new(operand as usize, 0),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Exp
            | Opcode::Min
            | Opcode::Max
            | Opcode::SaturatingAdd
            | Opcode::SaturatingSub
            | Opcode::SaturatingMul
            | Opcode::Every
            | Opcode::Any => StackEffect::new(operand as usize, 1),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
