use tracing::trace;

use crate::vm::bytecode::{
    CallOperand, ContextOperand, DebugMode, DoWhileOperand, LoopNOperand, MemoryOperand, MemoryRegion,
};
use crate::vm::context::VmContext;
use crate::vm::debug::DebugRecord;
use crate::vm::error::{HostError, VmError};
use crate::vm::expression::{DispatchEntry, Expression};
use crate::vm::host::Host;
use crate::vm::opcode::{Opcode, StackEffect};
use crate::word::{Word, truthy};

use super::frame::Frame;
use super::math;
use super::{MAX_DO_WHILE_ITERATIONS, MAX_EVAL_STEPS, MAX_STACK_SIZE};

type PureOp = fn(&[Word]) -> Result<Word, VmError>;

/// One evaluation in flight. Owns nothing beyond the borrow of the working
/// stack and the do-while and step budgets.
pub(super) struct Run<'r, 'a> {
    pub(super) expr: &'r Expression,
    pub(super) stack: &'r mut Vec<Word>,
    pub(super) ctx: &'r mut VmContext<'a>,
    pub(super) iterations: usize,
    pub(super) steps: usize,
}

impl Run<'_, '_> {
    pub(super) fn run_frame(&mut self, frame: Frame) -> Result<(), VmError> {
        let expr = self.expr;
        for (position, &entry) in expr.dispatch(frame.source_index).iter().enumerate() {
            self.steps += 1;
            if self.steps > MAX_EVAL_STEPS {
                return Err(VmError::StepBudgetExceeded { limit: MAX_EVAL_STEPS });
            }
            let (op, operand) = (entry.op, entry.operand);
            let effect = op.stack_effect(operand);
            let available = frame.window_len(self.stack.as_slice());
            if available < effect.inputs {
                return Err(VmError::StackUnderflow {
                    source_index: frame.source_index,
                    position,
                    needed: effect.inputs,
                    available,
                });
            }
            let grows = effect.outputs > effect.inputs;
            if grows && self.stack.len() - effect.inputs + effect.outputs > MAX_STACK_SIZE {
                return Err(VmError::StackOverflow {
                    source_index: frame.source_index,
                    position,
                    limit: MAX_STACK_SIZE,
                });
            }
            trace!(
                target: "wordvm::vm::eval",
                source = frame.source_index,
                position,
                depth = frame.depth,
                op = op.name(),
                operand,
                window = available,
                "step"
            );
            let before = self.stack.len();
            self.step(&frame, position, entry, effect)?;
            debug_assert_eq!(
                self.stack.len(),
                before - effect.inputs + effect.outputs,
                "{} broke its stack effect",
                op
            );
        }
        Ok(())
    }

    fn step(&mut self, frame: &Frame, position: usize, entry: DispatchEntry, effect: StackEffect) -> Result<(), VmError> {
        let operand = entry.operand;
        match entry.op {
            Opcode::ReadMemory => self.read_memory(frame, position, operand),
            Opcode::Call => self.call(frame, operand),
            Opcode::LoopN => self.loop_n(frame, operand),
            Opcode::DoWhile => self.do_while(frame, operand),
            Opcode::Debug => {
                if let Some(mode) = entry.debug_mode {
                    self.debug(frame, mode);
                }
                Ok(())
            }
            Opcode::Context => {
                let cell = ContextOperand::decode(operand);
                let value = self.ctx.host().context(cell.column, cell.row)?;
                self.stack.push(value);
                Ok(())
            }
            Opcode::BlockNumber => self.push_host(|host| host.block_number()),
            Opcode::Timestamp => self.push_host(|host| host.timestamp()),
            Opcode::Caller => self.push_host(|host| host.caller()),
            Opcode::ThisAddress => self.push_host(|host| host.this_address()),
            Opcode::Erc20BalanceOf => {
                let len = self.stack.len();
                let (token, account) = (self.stack[len - 2], self.stack[len - 1]);
                let balance = self.ctx.host().erc20_balance_of(token, account)?;
                self.stack.truncate(len - 2);
                self.stack.push(balance);
                Ok(())
            }
            Opcode::Erc20TotalSupply => {
                let len = self.stack.len();
                let supply = self.ctx.host().erc20_total_supply(self.stack[len - 1])?;
                self.stack[len - 1] = supply;
                Ok(())
            }
            Opcode::Add => self.reduce(effect.inputs, math::add),
            Opcode::Sub => self.reduce(effect.inputs, math::sub),
            Opcode::Mul => self.reduce(effect.inputs, math::mul),
            Opcode::Div => self.reduce(effect.inputs, math::div),
            Opcode::Mod => self.reduce(effect.inputs, math::rem),
            Opcode::Exp => self.reduce(effect.inputs, math::exp),
            Opcode::Min => self.reduce(effect.inputs, math::min),
            Opcode::Max => self.reduce(effect.inputs, math::max),
            Opcode::SaturatingAdd => self.reduce(effect.inputs, math::saturating_add),
            Opcode::SaturatingSub => self.reduce(effect.inputs, math::saturating_sub),
            Opcode::SaturatingMul => self.reduce(effect.inputs, math::saturating_mul),
            Opcode::IsZero => self.reduce(effect.inputs, math::is_zero),
            Opcode::EqualTo => self.reduce(effect.inputs, math::equal_to),
            Opcode::LessThan => self.reduce(effect.inputs, math::less_than),
            Opcode::GreaterThan => self.reduce(effect.inputs, math::greater_than),
            Opcode::Every => self.reduce(effect.inputs, math::every),
            Opcode::Any => self.reduce(effect.inputs, math::any),
            Opcode::EagerIf => self.reduce(effect.inputs, math::eager_if),
            Opcode::Ensure => {
                let start = self.stack.len() - effect.inputs;
                if let Some(input) = self.stack[start..].iter().position(Word::is_zero) {
                    return Err(VmError::EnsureFailed {
                        source_index: frame.source_index,
                        position,
                        input,
                    });
                }
                self.stack.truncate(start);
                Ok(())
            }
        }
    }

    /// Replace the top `n` words with `f` of them.
    #[inline]
    fn reduce(&mut self, n: usize, f: PureOp) -> Result<(), VmError> {
        let start = self.stack.len() - n;
        let value = f(&self.stack[start..])?;
        self.stack.truncate(start);
        self.stack.push(value);
        Ok(())
    }

    #[inline]
    fn push_host<F>(&mut self, read: F) -> Result<(), VmError>
    where
        F: FnOnce(&dyn Host) -> Result<Word, HostError>,
    {
        let value = read(self.ctx.host())?;
        self.stack.push(value);
        Ok(())
    }

    fn read_memory(&mut self, frame: &Frame, position: usize, operand: u16) -> Result<(), VmError> {
        let mem = MemoryOperand::decode(operand);
        let offset = mem.offset as usize;
        let value = match mem.region {
            MemoryRegion::Constant => self.expr.constants()[offset],
            MemoryRegion::Stack => match frame.window(self.stack.as_slice()).get(offset) {
                Some(value) => *value,
                None => {
                    return Err(VmError::StackUnderflow {
                        source_index: frame.source_index,
                        position,
                        needed: offset + 1,
                        available: frame.window_len(self.stack.as_slice()),
                    });
                }
            },
        };
        self.stack.push(value);
        Ok(())
    }

    /// Run `source_index` over the top `inputs` words and require exactly
    /// `outputs` words in its window afterwards.
    fn invoke(&mut self, caller: &Frame, source_index: usize, inputs: usize, outputs: usize) -> Result<(), VmError> {
        let callee = caller.nested(source_index, self.stack.len() - inputs)?;
        self.run_frame(callee)?;
        let actual = callee.window_len(self.stack.as_slice());
        if actual != outputs {
            return Err(VmError::StackMismatch {
                source_index,
                expected: outputs,
                actual,
            });
        }
        Ok(())
    }

    fn call(&mut self, frame: &Frame, operand: u16) -> Result<(), VmError> {
        let call = CallOperand::decode(operand);
        self.invoke(frame, call.source as usize, call.inputs as usize, call.outputs as usize)
    }

    fn loop_n(&mut self, frame: &Frame, operand: u16) -> Result<(), VmError> {
        let lp = LoopNOperand::decode(operand);
        for _ in 0..lp.n {
            self.invoke(frame, lp.source as usize, lp.inputs as usize, lp.outputs as usize)?;
        }
        Ok(())
    }

    fn do_while(&mut self, frame: &Frame, operand: u16) -> Result<(), VmError> {
        let dw = DoWhileOperand::decode(operand);
        let inputs = dw.inputs as usize;
        while truthy(&self.pop_condition()) {
            self.iterations += 1;
            if self.iterations > MAX_DO_WHILE_ITERATIONS {
                return Err(VmError::IterationCapExceeded {
                    limit: MAX_DO_WHILE_ITERATIONS,
                });
            }
            self.invoke(frame, dw.source as usize, inputs, inputs + 1)?;
        }
        Ok(())
    }

    /// Stack depth was checked by the caller, so the top word exists.
    #[inline]
    fn pop_condition(&mut self) -> Word {
        let top = self.stack.len() - 1;
        let cond = self.stack[top];
        self.stack.truncate(top);
        cond
    }

    fn debug(&mut self, frame: &Frame, mode: DebugMode) {
        let record = match mode {
            DebugMode::Stack => DebugRecord::Stack {
                stack: frame.window(self.stack.as_slice()).to_vec(),
            },
            DebugMode::State => DebugRecord::State {
                source_index: frame.source_index,
                constants: self.expr.constants().to_vec(),
                stack: self.stack.clone(),
            },
        };
        self.ctx.emit(record);
    }
}
