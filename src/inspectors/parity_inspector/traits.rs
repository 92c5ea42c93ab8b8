//! Trait implementations for ParityInspector
//!
//! - `Reset`: Clears the open execution and the last transaction's output
//! - `TraceOutput`: Returns the sequenced records of the last transaction
use crate::inspectors::parity_inspector::{ParityInspector, ParityTraceOutput};
use crate::traits::{Reset, TraceOutput};

impl Reset for ParityInspector {
    /// Resets all internal state for processing a new transaction
    ///
    /// The execution context, sink and precompile resolver are kept.
    fn reset(&mut self) {
        self.builder.abort();
        self.frame_depth = 0;
        self.started_at = None;
        self.traces = Vec::new();
        self.written = 0;
        self.failed_writes = 0;
        self.last_error = None;
    }
}

impl TraceOutput for ParityInspector {
    type Output = ParityTraceOutput;

    fn get_output(&self) -> Self::Output {
        ParityTraceOutput {
            traces: self.traces.clone(),
            written: self.written,
            failed_writes: self.failed_writes,
            error: self.last_error.clone(),
        }
    }
}
