//! Observational side channel fed by the `debug` opcode.
//!
//! Records flow one way, from the evaluator to a host-owned sink. Sink
//! failures are logged and dropped; they never reach the evaluation.

use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::word::{Word, serde_words};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DebugRecord {
    /// The current frame's window.
    Stack {
        #[serde(with = "serde_words")]
        stack: Vec<Word>,
    },
    /// Packed evaluation state: the active source, the constant pool and the
    /// whole working stack.
    State {
        source_index: usize,
        #[serde(with = "serde_words")]
        constants: Vec<Word>,
        #[serde(with = "serde_words")]
        stack: Vec<Word>,
    },
}

impl DebugRecord {
    pub fn stack(&self) -> &[Word] {
        match self {
            DebugRecord::Stack { stack } | DebugRecord::State { stack, .. } => stack,
        }
    }
}

pub trait DebugSink {
    fn emit(&mut self, record: DebugRecord) -> Result<()>;
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<DebugRecord>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DebugSink for RecordingSink {
    fn emit(&mut self, record: DebugRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

/// Logs records through `tracing`; used when the context has no sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn emit(&mut self, record: DebugRecord) -> Result<()> {
        match &record {
            DebugRecord::Stack { stack } => {
                tracing::info!(target: "wordvm::vm::debug", stack = ?DisplayWords(stack), "debug stack");
            }
            DebugRecord::State {
                source_index,
                constants,
                stack,
            } => {
                tracing::info!(
                    target: "wordvm::vm::debug",
                    source_index,
                    constants = ?DisplayWords(constants),
                    stack = ?DisplayWords(stack),
                    "debug state"
                );
            }
        }
        Ok(())
    }
}

/// Writes one JSON object per record.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DebugSink for JsonLinesSink<W> {
    fn emit(&mut self, record: DebugRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

struct DisplayWords<'a>(&'a [Word]);

impl std::fmt::Debug for DisplayWords<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (idx, w) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", w)?;
        }
        f.write_str("]")
    }
}
