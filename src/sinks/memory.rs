use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::SinkError;
use crate::traits::TraceSink;
use crate::types::TraceRecord;

/// In-memory collector of trace records
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn records(&self) -> Vec<TraceRecord> {
        self.lock().clone()
    }

    /// Remove and return everything written so far
    pub fn take(&self) -> Vec<TraceRecord> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records pushed before a writer panicked are still complete
    fn lock(&self) -> MutexGuard<'_, Vec<TraceRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TraceSink for MemorySink {
    fn write_record(&self, record: &TraceRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspectors::CallTreeBuilder;
    use crate::types::{Address, ExecutionContext};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn record(id: usize) -> TraceRecord {
        let mut builder = CallTreeBuilder::new();
        builder.start_execution(
            ExecutionContext::default(),
            &HashSet::<Address>::new(),
            false,
            Address::ZERO,
            Address::with_last_byte(0x42),
            &[],
            0,
            None,
        );
        let mut record = builder
            .finish_execution(&[], 0, Duration::ZERO, None)
            .unwrap()
            .remove(0);
        record.transaction_trace_id = id;
        record
    }

    #[test]
    fn test_take_drains() {
        let sink = MemorySink::new();
        sink.write_record(&record(0)).unwrap();
        sink.write_record(&record(1)).unwrap();

        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_poisoned_lock_keeps_records() {
        let sink = Arc::new(MemorySink::new());
        sink.write_record(&record(7)).unwrap();

        let poisoner = sink.clone();
        let result = thread::spawn(move || {
            let _guard = poisoner.records.lock().unwrap();
            panic!("writer panicked while holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(sink.records.is_poisoned());

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].transaction_trace_id, 7);
        assert!(matches!(sink.write_record(&record(8)), Err(SinkError::Poisoned)));
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }
}
