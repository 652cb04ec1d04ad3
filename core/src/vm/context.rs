use super::debug::{DebugRecord, DebugSink, TracingSink};
use super::host::{Host, NullHost};

/// Per-evaluation capabilities: the host state opcodes read through, and
/// where `debug` records go.
///
/// Without an explicit sink, records are logged through `tracing`.
pub struct VmContext<'a> {
    host: &'a dyn Host,
    sink: Option<&'a mut dyn DebugSink>,
}

impl Default for VmContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> VmContext<'a> {
    /// Context backed by [`NullHost`].
    pub fn new() -> Self {
        Self {
            host: &NullHost,
            sink: None,
        }
    }

    pub fn with_host(host: &'a dyn Host) -> Self {
        Self { host, sink: None }
    }

    pub fn with_sink(mut self, sink: &'a mut dyn DebugSink) -> Self {
        self.sink = Some(sink);
        self
    }

    #[inline]
    pub fn host(&self) -> &'a dyn Host {
        self.host
    }

    /// Deliver a record; failures are logged and dropped.
    pub(crate) fn emit(&mut self, record: DebugRecord) {
        let result = match self.sink.as_deref_mut() {
            Some(sink) => sink.emit(record),
            None => TracingSink.emit(record),
        };
        if let Err(err) = result {
            tracing::warn!(target: "wordvm::vm::debug", error = %err, "debug sink failed; record dropped");
        }
    }
}
