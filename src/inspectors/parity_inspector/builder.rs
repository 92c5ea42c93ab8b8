//! Call-tree reconstruction
//!
//! `CallTreeBuilder` turns the enter/exit events of one top-level execution
//! into flat Parity trace records:
//! - Records live in an arena in the order calls were opened
//! - The open-call stack holds arena indices, never references
//! - Each record keeps the index of its parent, so precompile elision
//!   adjusts the parent's subtrace count directly
//! - Sequencing happens once, when the root call finishes

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, trace};

use crate::errors::TracerError;
use crate::traits::PrecompileResolver;
use crate::types::*;

/// Lifecycle of the builder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No execution started yet
    #[default]
    Idle,
    /// Root call entered, events are being recorded
    Started,
    /// Root call exited and records were handed out
    Finished,
}

/// Stateful reconstruction of one execution's call tree
#[derive(Debug, Clone, Default)]
pub struct CallTreeBuilder {
    context: ExecutionContext,
    precompiles: HashSet<Address>,
    /// Every record opened so far, in open order
    records: Vec<TraceRecord>,
    /// Arena indices of the currently open calls, innermost last
    stack: Vec<usize>,
    phase: Phase,
}

impl CallTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracing a new top-level execution
    ///
    /// Discards anything left from a previous execution, resolves the
    /// precompiles active at the context's block and enters the root call.
    #[allow(clippy::too_many_arguments)]
    pub fn start_execution(
        &mut self,
        context: ExecutionContext,
        resolver: &dyn PrecompileResolver,
        is_create: bool,
        from: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: Option<U256>,
    ) {
        self.records.clear();
        self.stack.clear();
        self.context = context;
        self.precompiles = resolver.active_precompiles(context.block_number);
        self.phase = Phase::Started;

        debug!(
            block = context.block_number,
            tx = %context.transaction_hash,
            precompiles = self.precompiles.len(),
            "starting parity trace"
        );

        let op = if is_create {
            CallOperation::Create
        } else {
            CallOperation::Call
        };
        self.push_record(op, from, to, input, gas, value);
    }

    /// Record a call being opened
    ///
    /// The trace address is the innermost open call's address followed by
    /// its current subtrace count, which is then incremented.
    pub fn enter(
        &mut self,
        op: CallOperation,
        from: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: Option<U256>,
    ) -> Result<(), TracerError> {
        if self.phase != Phase::Started {
            return Err(TracerError::NotStarted);
        }
        self.push_record(op, from, to, input, gas, value);
        Ok(())
    }

    /// Open a record under the innermost open call, or as the root
    fn push_record(
        &mut self,
        op: CallOperation,
        from: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: Option<U256>,
    ) {
        let parent = self.stack.last().copied();
        let trace_address = match parent {
            Some(index) => {
                let parent = &mut self.records[index];
                let mut address = Vec::with_capacity(parent.trace_address.len() + 1);
                address.extend_from_slice(&parent.trace_address);
                address.push(parent.subtraces);
                parent.subtraces += 1;
                address
            }
            None => Vec::new(),
        };

        let record = TraceRecord {
            kind: op.kind(),
            action: TraceAction {
                call_type: op.name().to_string(),
                from,
                to,
                gas,
                input: Bytes::copy_from_slice(input),
                value: encode_value(value),
            },
            result: TraceResult::default(),
            subtraces: 0,
            trace_address,
            error: None,
            block_hash: self.context.block_hash,
            block_number: self.context.block_number,
            transaction_hash: self.context.transaction_hash,
            transaction_position: self.context.transaction_position,
            transaction_trace_id: 0,
            transaction_last_trace: false,
            parent,
        };

        self.records.push(record);
        self.stack.push(self.records.len() - 1);
    }

    /// Record the innermost open call returning
    ///
    /// Calls into active precompiles are dropped here, together with
    /// anything they opened, and their parent's subtrace count is decremented.
    pub fn exit(
        &mut self,
        output: &[u8],
        gas_used: u64,
        error: Option<CallError>,
    ) -> Result<(), TracerError> {
        let index = self.stack.pop().ok_or(TracerError::ExitWithoutEnter)?;

        let record = &mut self.records[index];
        record.result.gas_used = gas_used;
        record.result.output = Bytes::copy_from_slice(output);
        record.error = error;

        if self.precompiles.contains(&record.action.to) {
            let to = record.action.to;
            let parent = record.parent;
            // Everything after `index` was opened while it was open.
            self.records.truncate(index);
            if let Some(parent) = parent {
                self.records[parent].subtraces -= 1;
            }
            trace!(%to, "elided precompile call");
        }
        Ok(())
    }

    /// Close the root call and hand out the sequenced records
    ///
    /// # Returns
    /// * `Ok(records)` - All non-elided records in open order
    /// * `Err(TracerError)` - If the root is not the only open call
    pub fn finish_execution(
        &mut self,
        output: &[u8],
        gas_used: u64,
        elapsed: Duration,
        error: Option<CallError>,
    ) -> Result<Vec<TraceRecord>, TracerError> {
        if self.phase != Phase::Started {
            return Err(TracerError::NotStarted);
        }
        match self.stack.len() {
            0 => return Err(TracerError::ExitWithoutEnter),
            1 => {}
            depth => return Err(TracerError::UnterminatedCalls { open: depth - 1 }),
        }

        self.exit(output, gas_used, error)?;
        self.phase = Phase::Finished;

        let mut records = std::mem::take(&mut self.records);
        let last = records.len().saturating_sub(1);
        for (position, record) in records.iter_mut().enumerate() {
            record.transaction_trace_id = position;
            record.transaction_last_trace = position == last;
        }

        debug!(
            tx = %self.context.transaction_hash,
            records = records.len(),
            ?elapsed,
            "finished parity trace"
        );
        Ok(records)
    }

    /// Drop the current execution's state without emitting anything
    pub fn abort(&mut self) {
        self.records.clear();
        self.stack.clear();
        self.phase = Phase::Idle;
    }

    /// Number of currently open calls
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase == Phase::Started
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Records of the execution in progress, in open order
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Arena index of the innermost open call
    pub fn current(&self) -> Option<usize> {
        self.stack.last().copied()
    }

    /// Patch the callee of the innermost open call
    ///
    /// Contract creations only learn their address when they return.
    pub fn set_current_to(&mut self, to: Address) {
        if let Some(&index) = self.stack.last() {
            self.records[index].action.to = to;
        }
    }
}
