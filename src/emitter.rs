//! Hands finalized trace records to a durable sink
//!
//! Records are written one by one, in the order received. A record that
//! cannot be written is reported and skipped; the remaining records of the
//! transaction are still emitted.

use std::sync::Arc;

use tracing::warn;

use crate::errors::SinkError;
use crate::traits::TraceSink;
use crate::types::TraceRecord;

/// Outcome of emitting one transaction's records
#[derive(Debug, Default)]
pub struct EmitReport {
    /// Records accepted by the sink
    pub written: usize,
    /// Position and cause of every record the sink rejected
    pub failed: Vec<(usize, SinkError)>,
    /// Failure of the final flush, if any
    pub flush_error: Option<SinkError>,
}

impl EmitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.flush_error.is_none()
    }
}

/// Writes records through a shared sink
#[derive(Clone)]
pub struct TraceEmitter {
    sink: Arc<dyn TraceSink>,
}

impl TraceEmitter {
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<dyn TraceSink> {
        &self.sink
    }

    /// Write `records` to the sink in order, then flush once
    pub fn emit(&self, records: &[TraceRecord]) -> EmitReport {
        let mut report = EmitReport::default();

        for (position, record) in records.iter().enumerate() {
            match self.sink.write_record(record) {
                Ok(()) => report.written += 1,
                Err(error) => {
                    warn!(
                        tx = %record.transaction_hash,
                        position,
                        %error,
                        "failed to write trace record"
                    );
                    report.failed.push((position, error));
                }
            }
        }

        if let Err(error) = self.sink.flush() {
            warn!(%error, "failed to flush trace sink");
            report.flush_error = Some(error);
        }
        report
    }
}

impl std::fmt::Debug for TraceEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemorySink;
    use crate::types::*;
    use std::sync::Mutex;

    fn record(position: usize) -> TraceRecord {
        TraceRecord {
            kind: TraceKind::Call,
            action: TraceAction {
                call_type: "call".to_string(),
                from: Address::ZERO,
                to: Address::with_last_byte(0x42),
                gas: 0,
                input: Bytes::new(),
                value: Bytes::new(),
            },
            result: TraceResult::default(),
            subtraces: 0,
            trace_address: vec![position],
            error: None,
            block_hash: B256::ZERO,
            block_number: 1,
            transaction_hash: B256::ZERO,
            transaction_position: 0,
            transaction_trace_id: position,
            transaction_last_trace: false,
            parent: Some(0),
        }
    }

    /// Rejects the record at one position
    struct FlakySink {
        reject: usize,
        seen: Mutex<Vec<usize>>,
    }

    impl TraceSink for FlakySink {
        fn write_record(&self, record: &TraceRecord) -> Result<(), SinkError> {
            if record.transaction_trace_id == self.reject {
                return Err(SinkError::Closed);
            }
            self.seen.lock().unwrap().push(record.transaction_trace_id);
            Ok(())
        }
    }

    #[test]
    fn test_emits_in_order() {
        let sink = Arc::new(MemorySink::new());
        let emitter = TraceEmitter::new(sink.clone());
        let records: Vec<_> = (0..4).map(record).collect();

        let report = emitter.emit(&records);
        assert!(report.is_complete());
        assert_eq!(report.written, 4);
        assert_eq!(sink.records(), records);
    }

    #[test]
    fn test_failed_record_does_not_stop_emission() {
        let sink = Arc::new(FlakySink {
            reject: 1,
            seen: Mutex::new(Vec::new()),
        });
        let emitter = TraceEmitter::new(sink.clone());
        let records: Vec<_> = (0..3).map(record).collect();

        let report = emitter.emit(&records);
        assert!(!report.is_complete());
        assert_eq!(report.written, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 1);
        assert!(matches!(report.failed[0].1, SinkError::Closed));
        assert_eq!(*sink.seen.lock().unwrap(), vec![0, 2]);
    }
}
