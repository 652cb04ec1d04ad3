use std::fmt;

use super::error::LoadError;
use super::opcode::{Opcode, OperandKind};

/// Bytes per encoded instruction: `opcode: u16` then `operand: u16`, big-endian.
pub const INSTRUCTION_WIDTH: usize = 4;

/// One decoded instruction. The opcode is kept raw until the expression is
/// validated against the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: u16,
    pub operand: u16,
}

impl Instruction {
    #[inline]
    pub const fn new(op: Opcode, operand: u16) -> Self {
        Self {
            opcode: op.index(),
            operand,
        }
    }

    #[inline]
    pub const fn raw(opcode: u16, operand: u16) -> Self {
        Self { opcode, operand }
    }

    /// Opcode without operand fields.
    #[inline]
    pub const fn op(op: Opcode) -> Self {
        Self::new(op, 0)
    }

    /// Variadic opcode over `n` inputs.
    #[inline]
    pub const fn op_n(op: Opcode, n: u16) -> Self {
        Self::new(op, n)
    }

    #[inline]
    pub fn read_constant(offset: u16) -> Self {
        Self::new(Opcode::ReadMemory, MemoryOperand::constant(offset).encode())
    }

    #[inline]
    pub fn read_stack(offset: u16) -> Self {
        Self::new(Opcode::ReadMemory, MemoryOperand::stack(offset).encode())
    }

    #[inline]
    pub fn debug(mode: DebugMode) -> Self {
        Self::new(Opcode::Debug, mode as u16)
    }

    #[inline]
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_index(self.opcode)
    }
}

/// An ordered sequence of instructions, immutable once part of an expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    pub code: Vec<Instruction>,
}

impl Source {
    pub fn new(code: Vec<Instruction>) -> Self {
        Self { code }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl From<Vec<Instruction>> for Source {
    fn from(code: Vec<Instruction>) -> Self {
        Self::new(code)
    }
}

/// Decode raw bytes into a source. `source_index` only labels errors.
pub fn decode_source(source_index: usize, bytes: &[u8]) -> Result<Source, LoadError> {
    if bytes.len() % INSTRUCTION_WIDTH != 0 {
        return Err(LoadError::MalformedSource {
            source_index,
            len: bytes.len(),
            width: INSTRUCTION_WIDTH,
        });
    }
    let code = bytes
        .chunks_exact(INSTRUCTION_WIDTH)
        .map(|chunk| Instruction {
            opcode: u16::from_be_bytes([chunk[0], chunk[1]]),
            operand: u16::from_be_bytes([chunk[2], chunk[3]]),
        })
        .collect();
    Ok(Source { code })
}

pub fn encode_source(source: &Source) -> Vec<u8> {
    let mut out = Vec::with_capacity(source.len() * INSTRUCTION_WIDTH);
    for ins in &source.code {
        out.extend_from_slice(&ins.opcode.to_be_bytes());
        out.extend_from_slice(&ins.operand.to_be_bytes());
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    Stack = 0,
    Constant = 1,
}

/// Addressing mode of `read-memory`: bit 0 selects the region, bits 1..16
/// hold the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOperand {
    pub region: MemoryRegion,
    pub offset: u16,
}

impl MemoryOperand {
    pub const MAX_OFFSET: u16 = u16::MAX >> 1;

    pub const fn stack(offset: u16) -> Self {
        Self {
            region: MemoryRegion::Stack,
            offset,
        }
    }

    pub const fn constant(offset: u16) -> Self {
        Self {
            region: MemoryRegion::Constant,
            offset,
        }
    }

    #[inline]
    pub const fn decode(raw: u16) -> Self {
        let region = if raw & 1 == 0 {
            MemoryRegion::Stack
        } else {
            MemoryRegion::Constant
        };
        Self {
            region,
            offset: raw >> 1,
        }
    }

    /// Offsets above [`Self::MAX_OFFSET`] lose their top bit.
    #[inline]
    pub const fn encode(self) -> u16 {
        (self.offset << 1) | self.region as u16
    }
}

/// `call` operand: bits 0..4 inputs, 4..8 outputs, 8..16 source index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOperand {
    pub inputs: u8,
    pub outputs: u8,
    pub source: u8,
}

impl CallOperand {
    pub fn new(inputs: u8, outputs: u8, source: u8) -> Option<Self> {
        (inputs <= 0xF && outputs <= 0xF).then_some(Self {
            inputs,
            outputs,
            source,
        })
    }

    #[inline]
    pub const fn decode(raw: u16) -> Self {
        Self {
            inputs: (raw & 0xF) as u8,
            outputs: ((raw >> 4) & 0xF) as u8,
            source: (raw >> 8) as u8,
        }
    }

    #[inline]
    pub const fn encode(self) -> u16 {
        ((self.source as u16) << 8) | (((self.outputs & 0xF) as u16) << 4) | (self.inputs & 0xF) as u16
    }
}

/// `loop-n` operand: bits 0..4 inputs, 4..8 outputs, 8..12 source index,
/// 12..16 iteration count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopNOperand {
    pub n: u8,
    pub inputs: u8,
    pub outputs: u8,
    pub source: u8,
}

impl LoopNOperand {
    pub fn new(n: u8, inputs: u8, outputs: u8, source: u8) -> Option<Self> {
        (n <= 0xF && inputs <= 0xF && outputs <= 0xF && source <= 0xF).then_some(Self {
            n,
            inputs,
            outputs,
            source,
        })
    }

    #[inline]
    pub const fn decode(raw: u16) -> Self {
        Self {
            inputs: (raw & 0xF) as u8,
            outputs: ((raw >> 4) & 0xF) as u8,
            source: ((raw >> 8) & 0xF) as u8,
            n: (raw >> 12) as u8,
        }
    }

    #[inline]
    pub const fn encode(self) -> u16 {
        (((self.n & 0xF) as u16) << 12)
            | (((self.source & 0xF) as u16) << 8)
            | (((self.outputs & 0xF) as u16) << 4)
            | (self.inputs & 0xF) as u16
    }
}

/// `do-while` operand: bits 0..8 inputs, 8..16 source index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoWhileOperand {
    pub inputs: u8,
    pub source: u8,
}

impl DoWhileOperand {
    pub const fn new(inputs: u8, source: u8) -> Self {
        Self { inputs, source }
    }

    #[inline]
    pub const fn decode(raw: u16) -> Self {
        Self {
            inputs: (raw & 0xFF) as u8,
            source: (raw >> 8) as u8,
        }
    }

    #[inline]
    pub const fn encode(self) -> u16 {
        ((self.source as u16) << 8) | self.inputs as u16
    }
}

/// `context` operand: bits 0..8 row, 8..16 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOperand {
    pub column: u8,
    pub row: u8,
}

impl ContextOperand {
    pub const fn new(column: u8, row: u8) -> Self {
        Self { column, row }
    }

    #[inline]
    pub const fn decode(raw: u16) -> Self {
        Self {
            column: (raw >> 8) as u8,
            row: (raw & 0xFF) as u8,
        }
    }

    #[inline]
    pub const fn encode(self) -> u16 {
        ((self.column as u16) << 8) | self.row as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    /// Source index, constants and the whole working stack.
    State = 0,
    /// The current frame's window.
    Stack = 1,
}

impl DebugMode {
    pub const fn from_operand(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(DebugMode::State),
            1 => Some(DebugMode::Stack),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(op) = self.opcode() else {
            return write!(f, "#{}<{}>", self.opcode, self.operand);
        };
        let name = op.name();
        match op.operand_kind() {
            OperandKind::None => f.write_str(name),
            OperandKind::Memory => {
                let mem = MemoryOperand::decode(self.operand);
                let region = match mem.region {
                    MemoryRegion::Stack => "stack",
                    MemoryRegion::Constant => "constant",
                };
                write!(f, "{}<{} {}>", name, region, mem.offset)
            }
            OperandKind::Call => {
                let c = CallOperand::decode(self.operand);
                write!(f, "{}<{} {} {}>", name, c.inputs, c.outputs, c.source)
            }
            OperandKind::LoopN => {
                let l = LoopNOperand::decode(self.operand);
                write!(f, "{}<{} {} {} {}>", name, l.n, l.inputs, l.outputs, l.source)
            }
            OperandKind::DoWhile => {
                let d = DoWhileOperand::decode(self.operand);
                write!(f, "{}<{} {}>", name, d.inputs, d.source)
            }
            OperandKind::Context => {
                let c = ContextOperand::decode(self.operand);
                write!(f, "{}<{} {}>", name, c.column, c.row)
            }
            OperandKind::DebugMode => match DebugMode::from_operand(self.operand) {
                Some(DebugMode::State) => write!(f, "{}<state>", name),
                Some(DebugMode::Stack) => write!(f, "{}<stack>", name),
                None => write!(f, "{}<{}>", name, self.operand),
            },
            OperandKind::Inputs { .. } => write!(f, "{}<{}>", name, self.operand),
        }
    }
}
