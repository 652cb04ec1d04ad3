use thiserror::Error;

/// Why an expression was rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("source {source_index}: byte length {len} is not a multiple of {width}")]
    MalformedSource { source_index: usize, len: usize, width: usize },

    #[error("source {source_index} instruction {position}: unknown opcode {opcode} (table size {table_size})")]
    UnknownOpcode {
        source_index: usize,
        position: usize,
        opcode: u16,
        table_size: usize,
    },

    #[error(
        "source {source_index} instruction {position}: constant {offset} out of range (pool has {constants_len})"
    )]
    ConstantOutOfRange {
        source_index: usize,
        position: usize,
        offset: usize,
        constants_len: usize,
    },

    #[error("source {source_index} instruction {position}: source {target} out of range (expression has {sources_len})")]
    SourceOutOfRange {
        source_index: usize,
        position: usize,
        target: usize,
        sources_len: usize,
    },

    #[error("source {source_index} instruction {position}: invalid operand {operand:#06x} for {opcode}: {reason}")]
    InvalidOperand {
        source_index: usize,
        position: usize,
        opcode: &'static str,
        operand: u16,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticKind {
    Overflow,
    Underflow,
    DivisionByZero,
}

impl std::fmt::Display for ArithmeticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArithmeticKind::Overflow => f.write_str("overflow"),
            ArithmeticKind::Underflow => f.write_str("underflow"),
            ArithmeticKind::DivisionByZero => f.write_str("division by zero"),
        }
    }
}

/// Failure raised by a host capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host does not provide {0}")]
    Unsupported(&'static str),

    #[error("no context value at column {column} row {row}")]
    MissingContext { column: u8, row: u8 },

    #[error("unknown token {0:#x}")]
    UnknownToken(crate::word::Word),

    #[error("host call failed: {0}")]
    Failed(String),
}

/// Evaluation failure. Any of these aborts the whole evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("entry source {index} out of range (expression has {sources_len})")]
    UnknownSource { index: usize, sources_len: usize },

    #[error("stack underflow in source {source_index} at instruction {position}: needed {needed}, window holds {available}")]
    StackUnderflow {
        source_index: usize,
        position: usize,
        needed: usize,
        available: usize,
    },

    #[error("source {source_index} left {actual} words, expected {expected}")]
    StackMismatch {
        source_index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("stack overflow in source {source_index} at instruction {position}: more than {limit} words")]
    StackOverflow {
        source_index: usize,
        position: usize,
        limit: usize,
    },

    #[error("arithmetic {kind} in {op}")]
    Arithmetic { op: &'static str, kind: ArithmeticKind },

    #[error("call depth exceeded the limit of {limit}")]
    CallDepthExceeded { limit: usize },

    #[error("do-while iterations exceeded the limit of {limit}")]
    IterationCapExceeded { limit: usize },

    #[error("evaluation exceeded the budget of {limit} instructions")]
    StepBudgetExceeded { limit: usize },

    #[error("ensure failed in source {source_index} at instruction {position} (input {input})")]
    EnsureFailed {
        source_index: usize,
        position: usize,
        input: usize,
    },

    #[error(transparent)]
    Host(#[from] HostError),
}
