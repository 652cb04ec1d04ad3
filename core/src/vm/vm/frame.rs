use crate::vm::error::VmError;
use crate::word::Word;

use super::MAX_CALL_DEPTH;

/// Transient state for one source invocation. The window is
/// `stack[base..]`; nothing below `base` is visible to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) source_index: usize,
    pub(crate) base: usize,
    pub(crate) depth: usize,
}

impl Frame {
    pub(crate) const fn entry(source_index: usize) -> Self {
        Self {
            source_index,
            base: 0,
            depth: 0,
        }
    }

    /// Frame for a callee whose window starts at `base`.
    pub(crate) fn nested(&self, source_index: usize, base: usize) -> Result<Self, VmError> {
        let depth = self.depth + 1;
        if depth > MAX_CALL_DEPTH {
            return Err(VmError::CallDepthExceeded { limit: MAX_CALL_DEPTH });
        }
        Ok(Self {
            source_index,
            base,
            depth,
        })
    }

    #[inline]
    pub(crate) fn window_len(&self, stack: &[Word]) -> usize {
        stack.len() - self.base
    }

    #[inline]
    pub(crate) fn window<'s>(&self, stack: &'s [Word]) -> &'s [Word] {
        &stack[self.base..]
    }
}
