//! Error types for call tracing and trace persistence
//!
//! This module defines the error handling system of the crate:
//! - Tracer contract violations (mis-nested enter/exit events)
//! - Sink write failures
//! - Configuration errors
//!
//! Errors reported by the traced calls themselves (reverts, halts) are not
//! errors of this crate; they travel as [`crate::types::CallError`] data.

use thiserror::Error;

/// Top-level error type of the crate
#[derive(Debug, Error)]
pub enum ParityTraceError {
    /// The host broke the enter/exit protocol
    #[error("Tracer contract violated: {0}")]
    Tracer(#[from] TracerError),

    /// A record could not be persisted
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Invalid tracer configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Contract violations of the call-tree builder
///
/// These are programming errors of the host driving the builder. The trace
/// of the current execution is abandoned when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TracerError {
    /// `enter` or `finish_execution` called before `start_execution`
    #[error("no execution in progress")]
    NotStarted,

    /// `exit` called with no open call
    #[error("exit without a matching enter")]
    ExitWithoutEnter,

    /// `finish_execution` called while nested calls are still open
    #[error("execution finished with {open} unterminated calls")]
    UnterminatedCalls {
        /// Open calls besides the root
        open: usize,
    },
}

/// Failures writing records to a sink
///
/// Reported per record; emission of the remaining records continues.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying writer or file failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Receiving side of a channel sink was dropped
    #[error("Sink closed")]
    Closed,

    /// A writer panicked while holding the sink lock
    #[error("Sink lock poisoned")]
    Poisoned,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Partition sizes must be non-zero
    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    /// Hardfork activations must be listed in ascending block order
    #[error("Hardfork schedule not sorted at block {0}")]
    UnsortedSchedule(u64),
}
