mod exec;
mod frame;
mod math;

use tracing::debug;

use crate::vm::context::VmContext;
use crate::vm::error::VmError;
use crate::vm::expression::Expression;
use crate::vm::host::Host;
use crate::word::Word;

use exec::Run;
use frame::Frame;

/// Deepest allowed nesting of `call` / `loop-n` / `do-while` bodies.
pub const MAX_CALL_DEPTH: usize = 32;
/// Total `do-while` body runs allowed in one evaluation.
pub const MAX_DO_WHILE_ITERATIONS: usize = 1024;
/// Largest working stack, in words, across all frames.
pub const MAX_STACK_SIZE: usize = 1024;
/// Instructions executed in one evaluation, across every frame.
pub const MAX_EVAL_STEPS: usize = 1 << 16;

/// Evaluation loop. Reuses an internal stack buffer across evaluations; the
/// buffer never outlives a single `eval` call's result.
#[derive(Debug, Default)]
pub struct Vm {
    stack: Vec<Word>,
}

impl Vm {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn eval(
        &mut self,
        expr: &Expression,
        source_index: usize,
        ctx: &mut VmContext<'_>,
    ) -> Result<Vec<Word>, VmError> {
        self.eval_with(expr, source_index, &[], ctx)
    }

    /// Evaluate `source_index` with its window seeded by `inputs`. Either the
    /// whole final window comes back or an error does; nothing in between.
    pub fn eval_with(
        &mut self,
        expr: &Expression,
        source_index: usize,
        inputs: &[Word],
        ctx: &mut VmContext<'_>,
    ) -> Result<Vec<Word>, VmError> {
        if expr.source(source_index).is_none() {
            return Err(VmError::UnknownSource {
                index: source_index,
                sources_len: expr.sources().len(),
            });
        }
        if inputs.len() > MAX_STACK_SIZE {
            return Err(VmError::StackOverflow {
                source_index,
                position: 0,
                limit: MAX_STACK_SIZE,
            });
        }

        self.stack.clear();
        self.stack.extend_from_slice(inputs);
        let result = Run {
            expr,
            stack: &mut self.stack,
            ctx,
            iterations: 0,
            steps: 0,
        }
        .run_frame(Frame::entry(source_index));

        match result {
            Ok(()) => {
                debug!(target: "wordvm::vm::eval", source_index, outputs = self.stack.len(), "evaluation finished");
                Ok(self.stack.drain(..).collect())
            }
            Err(err) => {
                self.stack.clear();
                debug!(target: "wordvm::vm::eval", source_index, error = %err, "evaluation aborted");
                Err(err)
            }
        }
    }
}

/// One-shot evaluation with a fresh [`Vm`] and no debug sink.
pub fn evaluate(expr: &Expression, source_index: usize, host: &dyn Host) -> Result<Vec<Word>, VmError> {
    let mut ctx = VmContext::with_host(host);
    Vm::new().eval(expr, source_index, &mut ctx)
}
