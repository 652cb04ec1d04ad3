//! Word expression VM subsystem
//!
//! Bytecode sources plus a constant pool are validated into an
//! [`Expression`], then evaluated by [`Vm`] against a [`Host`] with an
//! optional [`DebugSink`] attached through [`VmContext`].

mod asm;
mod bytecode;
mod config;
mod context;
mod debug;
mod error;
mod expression;
mod host;
mod opcode;
#[allow(clippy::module_inception)]
mod vm;

pub use asm::{assemble_expression, assemble_source, disassemble};
pub use bytecode::*;
pub use config::{DocumentFormat, ExpressionConfig, decode_hex, encode_hex, parse_document};
pub use context::VmContext;
pub use debug::{DebugRecord, DebugSink, JsonLinesSink, RecordingSink, TracingSink};
pub use error::{ArithmeticKind, HostError, LoadError, VmError};
pub use expression::Expression;
pub use host::{Balance, Host, NullHost, StaticHost, TokenState};
pub use opcode::{DISPATCH_TABLE_SIZE, OPCODES, Opcode, OperandKind, StackEffect};
pub use vm::*;
