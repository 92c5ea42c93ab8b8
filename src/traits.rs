//! Extension points of the tracer
//!
//! # Key Traits
//! - `Reset`: Clear inspector data between transactions
//! - `TraceOutput`: Read the collected trace of the last transaction
//! - `TraceSink`: Durable destination of finalized trace records
//! - `PrecompileResolver`: Active precompile addresses at a given block

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::SinkError;
use crate::types::{Address, TraceRecord};

/// Trait for resetting inspector state between transactions
///
/// Implementors should clear any accumulated state:
/// - Open call stack
/// - Collected records
/// - Per-transaction errors and reports
pub trait Reset {
    /// Clears all accumulated state data
    fn reset(&mut self);
}

/// Trait for extracting the collected output of an inspector
pub trait TraceOutput {
    type Output;

    fn get_output(&self) -> Self::Output;
}

/// Append-only destination for trace records
///
/// Sinks may be shared by many tracers running on different threads, so
/// implementations serialize concurrent writes themselves. Records of one
/// transaction arrive in order and must be kept in that order.
pub trait TraceSink: Send + Sync {
    /// Persist a single record
    fn write_record(&self, record: &TraceRecord) -> Result<(), SinkError>;

    /// Called once after the last record of a transaction
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Arc<T> {
    fn write_record(&self, record: &TraceRecord) -> Result<(), SinkError> {
        (**self).write_record(record)
    }

    fn flush(&self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Source of the precompile addresses active under a block's protocol rules
///
/// Calls into these addresses are elided from the emitted trace.
pub trait PrecompileResolver: Send + Sync {
    fn active_precompiles(&self, block_number: u64) -> HashSet<Address>;
}

/// A fixed precompile set, independent of the block
impl PrecompileResolver for HashSet<Address> {
    fn active_precompiles(&self, _block_number: u64) -> HashSet<Address> {
        self.clone()
    }
}
