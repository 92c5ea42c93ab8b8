//! Parity-style flat call trace inspector
//!
//! This module provides the `ParityInspector` type, which records every call
//! of a transaction as a flat Parity trace record and writes the finished
//! trace to a sink.
//!
//! # Architecture
//!
//! The implementation is split across several modules:
//! - `builder`: Call-tree reconstruction, precompile elision and sequencing
//! - `inspector`: REVM Inspector trait implementation
//! - `traits`: `Reset` and `TraceOutput` implementations
//!
//! # Lifecycle
//!
//! 1. The host sets the transaction's [`ExecutionContext`]
//! 2. The first call frame starts a new execution in the builder
//! 3. Nested frames enter and exit as revm reports them
//! 4. When the first frame returns, the records are sequenced and emitted

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, warn};

use crate::config::HardforkSchedule;
use crate::emitter::TraceEmitter;
use crate::errors::TracerError;
use crate::traits::{PrecompileResolver, TraceSink};
use crate::types::*;

pub mod builder;
mod inspector;
mod traits;

pub use builder::{CallTreeBuilder, Phase};

/// Inspector producing Parity call traces
///
/// Each clone owns its own builder, so independent transactions can be
/// traced on different threads while sharing one sink.
#[derive(Clone)]
pub struct ParityInspector {
    /// Call-tree state of the execution in progress
    builder: CallTreeBuilder,
    /// Destination of finished traces
    emitter: TraceEmitter,
    /// Active precompiles by block
    resolver: Arc<dyn PrecompileResolver>,
    /// Metadata of the next or current transaction
    context: ExecutionContext,
    /// Open revm frames, tracked independently of the builder
    frame_depth: usize,
    started_at: Option<Instant>,
    /// Records of the last finished transaction
    traces: Vec<TraceRecord>,
    written: usize,
    failed_writes: usize,
    /// Contract violation that aborted the last trace
    last_error: Option<TracerError>,
}

/// Result of tracing one transaction
#[derive(Debug, Clone, Serialize)]
pub struct ParityTraceOutput {
    /// Sequenced records, in call-open order
    pub traces: Vec<TraceRecord>,
    /// Records accepted by the sink
    pub written: usize,
    /// Records the sink rejected
    pub failed_writes: usize,
    /// Set when the trace was abandoned
    #[serde(skip)]
    pub error: Option<TracerError>,
}

impl ParityInspector {
    /// Creates an inspector writing to `sink`, using mainnet precompile rules
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self {
            builder: CallTreeBuilder::new(),
            emitter: TraceEmitter::new(sink),
            resolver: Arc::new(HardforkSchedule::mainnet()),
            context: ExecutionContext::default(),
            frame_depth: 0,
            started_at: None,
            traces: Vec::new(),
            written: 0,
            failed_writes: 0,
            last_error: None,
        }
    }

    /// Replace the source of active precompile addresses
    pub fn with_resolver(mut self, resolver: Arc<dyn PrecompileResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the metadata of the transaction about to execute
    ///
    /// The block number is taken from the EVM's block environment when the
    /// transaction starts; the other fields are copied as given. An execution
    /// still in progress was abandoned by the host and is dropped.
    pub fn set_context(&mut self, context: ExecutionContext) -> &mut Self {
        self.discard_unfinished();
        self.context = context;
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Returns the records of the last finished transaction
    pub fn get_traces(&self) -> &[TraceRecord] {
        &self.traces
    }

    /// Returns the contract violation that aborted the last trace, if any
    pub fn last_error(&self) -> Option<&TracerError> {
        self.last_error.as_ref()
    }

    pub fn builder(&self) -> &CallTreeBuilder {
        &self.builder
    }

    /// A call frame was opened
    ///
    /// The first frame of a transaction starts a new execution.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn on_enter(
        &mut self,
        block_number: u64,
        op: CallOperation,
        from: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: Option<U256>,
    ) {
        self.frame_depth += 1;
        if self.frame_depth == 1 {
            let context = ExecutionContext {
                block_number,
                ..self.context
            };
            self.traces.clear();
            self.written = 0;
            self.failed_writes = 0;
            self.last_error = None;
            self.started_at = Some(Instant::now());
            let is_create = op.kind() == TraceKind::Create;
            self.builder.start_execution(
                context,
                self.resolver.as_ref(),
                is_create,
                from,
                to,
                input,
                gas,
                value,
            );
            return;
        }

        if let Err(err) = self.builder.enter(op, from, to, input, gas, value) {
            self.fail(err);
        }
    }

    /// A call frame returned
    ///
    /// When the first frame returns the trace is finalized and emitted.
    pub(crate) fn on_exit(&mut self, output: &[u8], gas_used: u64, error: Option<CallError>) {
        if self.frame_depth == 0 {
            self.fail(TracerError::ExitWithoutEnter);
            return;
        }
        self.frame_depth -= 1;

        if self.frame_depth > 0 {
            if let Err(err) = self.builder.exit(output, gas_used, error) {
                self.fail(err);
            }
            return;
        }

        let elapsed = self
            .started_at
            .take()
            .map(|started| started.elapsed())
            .unwrap_or_default();
        match self
            .builder
            .finish_execution(output, gas_used, elapsed, error)
        {
            Ok(records) => {
                let report = self.emitter.emit(&records);
                self.written = report.written;
                self.failed_writes = report.failed.len();
                self.traces = records;
            }
            Err(err) => self.fail(err),
        }
    }

    /// A self-destruct inside the current frame, recorded as a closed child
    pub(crate) fn on_selfdestruct(&mut self, contract: Address, target: Address, value: U256) {
        if !self.builder.is_started() || self.builder.depth() == 0 {
            return;
        }
        let result = self
            .builder
            .enter(CallOperation::SelfDestruct, contract, target, &[], 0, Some(value))
            .and_then(|()| self.builder.exit(&[], 0, None));
        if let Err(err) = result {
            self.fail(err);
        }
    }

    /// Drop an execution whose frames never all returned
    fn discard_unfinished(&mut self) {
        if self.frame_depth > 0 || self.builder.is_started() {
            warn!(
                tx = %self.context.transaction_hash,
                open_frames = self.frame_depth,
                "discarding unfinished parity trace"
            );
        }
        self.frame_depth = 0;
        self.started_at = None;
        if self.builder.is_started() {
            self.builder.abort();
        }
    }

    /// Report a contract violation, abandoning the current trace
    ///
    /// Only the first violation of an execution is kept. Events that follow
    /// it in the same execution hit an idle builder and fail again, so they
    /// are not reported on top of it.
    fn fail(&mut self, err: TracerError) {
        if self.builder.is_started() {
            self.builder.abort();
        } else if self.last_error.is_some() {
            return;
        }
        error!(
            tx = %self.context.transaction_hash,
            error = %err,
            "parity trace contract violation"
        );
        self.last_error = Some(err);
    }
}

impl std::fmt::Debug for ParityInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParityInspector")
            .field("builder", &self.builder)
            .field("context", &self.context)
            .field("frame_depth", &self.frame_depth)
            .field("traces", &self.traces.len())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemorySink;
    use std::collections::HashSet;

    const SENDER: Address = Address::repeat_byte(0x11);
    const TARGET: Address = Address::repeat_byte(0x22);

    fn inspector(sink: Arc<MemorySink>) -> ParityInspector {
        let precompiles: HashSet<Address> = [Address::with_last_byte(2)].into_iter().collect();
        let mut inspector = ParityInspector::new(sink).with_resolver(Arc::new(precompiles));
        inspector.set_context(ExecutionContext::new(
            B256::repeat_byte(0xb1),
            0,
            B256::repeat_byte(0x7f),
            4,
        ));
        inspector
    }

    #[test]
    fn test_first_frame_starts_and_last_exit_emits() {
        let sink = Arc::new(MemorySink::new());
        let mut inspector = inspector(sink.clone());

        inspector.on_enter(500, CallOperation::Call, SENDER, TARGET, &[1], 90_000, None);
        inspector.on_enter(500, CallOperation::StaticCall, TARGET, SENDER, &[], 40_000, None);
        inspector.on_exit(&[], 100, None);
        assert!(sink.is_empty());

        inspector.on_exit(&[2], 30_000, None);
        let emitted = sink.records();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].block_number, 500);
        assert_eq!(emitted[0].transaction_position, 4);
        assert_eq!(emitted[1].action.call_type, "staticcall");
        assert!(emitted[1].transaction_last_trace);
        assert_eq!(inspector.get_traces(), emitted.as_slice());
        assert!(inspector.last_error().is_none());
    }

    #[test]
    fn test_selfdestruct_is_recorded_as_closed_child() {
        let sink = Arc::new(MemorySink::new());
        let mut inspector = inspector(sink.clone());

        inspector.on_enter(1, CallOperation::Call, SENDER, TARGET, &[], 50_000, None);
        inspector.on_selfdestruct(TARGET, SENDER, U256::from(1_000));
        inspector.on_exit(&[], 5_000, None);

        let emitted = sink.records();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].subtraces, 1);
        assert_eq!(emitted[1].kind, TraceKind::Suicide);
        assert_eq!(emitted[1].action.call_type, "selfdestruct");
        assert_eq!(emitted[1].trace_address, vec![0]);
        assert_eq!(emitted[1].action.value.as_ref(), &[0x03, 0xe8]);
    }

    #[test]
    fn test_output_and_reset() {
        use crate::traits::{Reset, TraceOutput};

        let sink = Arc::new(MemorySink::new());
        let mut inspector = inspector(sink.clone());
        inspector.on_enter(9, CallOperation::Call, SENDER, TARGET, &[], 0, None);
        inspector.on_enter(9, CallOperation::Call, TARGET, Address::with_last_byte(2), &[], 0, None);
        inspector.on_exit(&[], 60, None);
        inspector.on_exit(&[], 100, None);

        let output = inspector.get_output();
        assert_eq!(output.traces.len(), 1);
        assert_eq!(output.traces[0].subtraces, 0);
        assert_eq!(output.written, 1);
        assert_eq!(output.failed_writes, 0);
        assert!(output.error.is_none());

        inspector.reset();
        assert!(inspector.get_output().traces.is_empty());
        assert_eq!(inspector.builder().phase(), Phase::Idle);
        assert_eq!(inspector.context().transaction_position, 4);
    }

    #[test]
    fn test_abandoned_execution_does_not_leak_into_next() {
        let sink = Arc::new(MemorySink::new());
        let mut inspector = inspector(sink.clone());

        // The host gives up on the first transaction with two frames open.
        inspector.on_enter(3, CallOperation::Call, SENDER, TARGET, &[], 0, None);
        inspector.on_enter(3, CallOperation::Call, TARGET, SENDER, &[], 0, None);

        let next_tx = B256::repeat_byte(0x02);
        inspector.set_context(ExecutionContext::new(B256::ZERO, 0, next_tx, 5));
        assert_eq!(inspector.frame_depth, 0);
        assert_eq!(inspector.builder().phase(), Phase::Idle);

        inspector.on_enter(4, CallOperation::Call, SENDER, TARGET, &[], 0, None);
        inspector.on_exit(&[], 21_000, None);

        let emitted = sink.records();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].transaction_hash, next_tx);
        assert_eq!(emitted[0].transaction_position, 5);
        assert!(emitted[0].trace_address.is_empty());
        assert!(emitted[0].transaction_last_trace);
        assert_eq!(inspector.get_traces(), emitted.as_slice());
        assert!(inspector.last_error().is_none());
    }

    #[test]
    fn test_first_violation_is_kept() {
        let sink = Arc::new(MemorySink::new());
        let mut inspector = inspector(sink.clone());

        inspector.on_enter(1, CallOperation::Call, SENDER, TARGET, &[], 0, None);
        inspector.on_enter(1, CallOperation::Call, TARGET, SENDER, &[], 0, None);
        // Leave the builder with no open call for the nested frame's exit.
        inspector.builder.exit(&[], 0, None).unwrap();
        inspector.builder.exit(&[], 0, None).unwrap();

        inspector.on_exit(&[], 0, None);
        assert_eq!(inspector.builder().phase(), Phase::Idle);
        // The rest of the execution hits an idle builder.
        inspector.on_enter(1, CallOperation::Call, TARGET, SENDER, &[], 0, None);
        inspector.on_exit(&[], 0, None);
        inspector.on_exit(&[], 0, None);

        assert_eq!(inspector.last_error(), Some(&TracerError::ExitWithoutEnter));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unbalanced_exit_aborts_without_emitting() {
        let sink = Arc::new(MemorySink::new());
        let mut inspector = inspector(sink.clone());

        inspector.on_exit(&[], 0, None);
        assert_eq!(inspector.last_error(), Some(&TracerError::ExitWithoutEnter));
        assert!(sink.is_empty());

        inspector.on_enter(1, CallOperation::Call, SENDER, TARGET, &[], 0, None);
        inspector.on_enter(1, CallOperation::Call, TARGET, SENDER, &[], 0, None);
        // Desynchronize the builder from the frames revm reports.
        inspector.builder.exit(&[], 0, None).unwrap();
        inspector.on_exit(&[], 0, None);
        inspector.on_exit(&[], 0, None);

        assert!(sink.is_empty());
        assert!(inspector.get_traces().is_empty());
        assert_eq!(inspector.last_error(), Some(&TracerError::ExitWithoutEnter));
        assert_eq!(inspector.builder().phase(), Phase::Idle);
    }
}
