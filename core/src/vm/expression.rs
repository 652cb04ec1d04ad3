use std::sync::Arc;

use tracing::debug;

use crate::word::Word;

use super::bytecode::{
    CallOperand, DebugMode, DoWhileOperand, Instruction, LoopNOperand, MemoryOperand, MemoryRegion, Source,
    decode_source,
};
use super::error::LoadError;
use super::opcode::{DISPATCH_TABLE_SIZE, Opcode, OperandKind};

/// A validated bundle of sources and the constant pool they share.
///
/// Construction checks every instruction once; evaluation can then index
/// constants, sources and the dispatch table without re-validating.
#[derive(Debug, Clone)]
pub struct Expression {
    sources: Arc<[Source]>,
    constants: Arc<[Word]>,
    dispatch: Arc<[Box<[DispatchEntry]>]>,
}

/// An instruction resolved against the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DispatchEntry {
    pub(crate) op: Opcode,
    pub(crate) operand: u16,
    /// Set for `debug` only.
    pub(crate) debug_mode: Option<DebugMode>,
}

impl Expression {
    /// Decode and validate raw source bytes.
    pub fn new(sources: Vec<Vec<u8>>, constants: Vec<Word>) -> Result<Self, LoadError> {
        let decoded = sources
            .iter()
            .enumerate()
            .map(|(idx, bytes)| decode_source(idx, bytes))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_sources(decoded, constants)
    }

    /// Validate already decoded sources.
    pub fn from_sources(sources: Vec<Source>, constants: Vec<Word>) -> Result<Self, LoadError> {
        let mut dispatch = Vec::with_capacity(sources.len());
        for (source_index, source) in sources.iter().enumerate() {
            let entries = source
                .code
                .iter()
                .enumerate()
                .map(|(position, ins)| {
                    validate_instruction(source_index, position, ins, sources.len(), constants.len())
                })
                .collect::<Result<Box<[_]>, _>>()?;
            dispatch.push(entries);
        }
        debug!(
            target: "wordvm::vm::load",
            sources = sources.len(),
            constants = constants.len(),
            instructions = sources.iter().map(Source::len).sum::<usize>(),
            "expression loaded"
        );
        Ok(Self {
            sources: sources.into(),
            constants: constants.into(),
            dispatch: dispatch.into(),
        })
    }

    #[inline]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    #[inline]
    pub fn source(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    #[inline]
    pub fn constants(&self) -> &[Word] {
        &self.constants
    }

    /// Resolved instructions of a source known to exist.
    #[inline]
    pub(crate) fn dispatch(&self, index: usize) -> &[DispatchEntry] {
        &self.dispatch[index]
    }
}

fn validate_instruction(
    source_index: usize,
    position: usize,
    ins: &Instruction,
    sources_len: usize,
    constants_len: usize,
) -> Result<DispatchEntry, LoadError> {
    let op = ins.opcode().ok_or(LoadError::UnknownOpcode {
        source_index,
        position,
        opcode: ins.opcode,
        table_size: DISPATCH_TABLE_SIZE,
    })?;
    let invalid = |reason: &'static str| LoadError::InvalidOperand {
        source_index,
        position,
        opcode: op.name(),
        operand: ins.operand,
        reason,
    };
    let check_source = |target: usize| {
        if target < sources_len {
            Ok(())
        } else {
            Err(LoadError::SourceOutOfRange {
                source_index,
                position,
                target,
                sources_len,
            })
        }
    };

    let mut debug_mode = None;
    let checked = match op.operand_kind() {
        OperandKind::None | OperandKind::Context => Ok(()),
        OperandKind::Memory => {
            let mem = MemoryOperand::decode(ins.operand);
            if mem.region == MemoryRegion::Constant && mem.offset as usize >= constants_len {
                return Err(LoadError::ConstantOutOfRange {
                    source_index,
                    position,
                    offset: mem.offset as usize,
                    constants_len,
                });
            }
            Ok(())
        }
        OperandKind::Call => check_source(CallOperand::decode(ins.operand).source as usize),
        OperandKind::LoopN => {
            let lp = LoopNOperand::decode(ins.operand);
            if lp.inputs != lp.outputs {
                return Err(invalid("loop-n must produce as many outputs as it takes inputs"));
            }
            check_source(lp.source as usize)
        }
        OperandKind::DoWhile => check_source(DoWhileOperand::decode(ins.operand).source as usize),
        OperandKind::DebugMode => match DebugMode::from_operand(ins.operand) {
            Some(mode) => {
                debug_mode = Some(mode);
                Ok(())
            }
            None => Err(invalid("debug mode must be 0 (state) or 1 (stack)")),
        },
        OperandKind::Inputs { min } => {
            if ins.operand < min {
                Err(invalid(if op == Opcode::Ensure {
                    "ensure needs at least one input"
                } else {
                    "opcode needs at least two inputs"
                }))
            } else {
                Ok(())
            }
        }
    };
    checked.map(|()| DispatchEntry {
        op,
        operand: ins.operand,
        debug_mode,
    })
}
