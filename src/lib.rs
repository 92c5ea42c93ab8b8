//! # REVM Parity Call Tracer
//!
//! Records the calls made while a transaction executes in revm and writes
//! them as flat Parity-style (`trace_*` API) trace records.
//!
//! ## Core Features
//!
//! - **Call-tree reconstruction**
//!   - Trace addresses assigned when each call opens
//!   - Subtrace counts maintained as children open and close
//!   - Calls into precompiled contracts elided, with parent counts adjusted
//!
//! - **Trace output**
//!   - Records sequenced per transaction, last record flagged
//!   - JSON lines, block-partitioned log files, in-memory and channel sinks
//!   - Best-effort emission: a failed record never stops the rest
//!
//! ## Example Usage
//!
//! ```rust
//! use std::{collections::HashSet, sync::Arc, time::Duration};
//! use revm_parity_trace::{
//!     sinks::MemorySink,
//!     types::{Address, CallOperation, ExecutionContext},
//!     CallTreeBuilder, TraceEmitter,
//! };
//!
//! let sender = Address::repeat_byte(0x11);
//! let contract = Address::repeat_byte(0x22);
//! let precompiles: HashSet<Address> = [Address::with_last_byte(1)].into_iter().collect();
//!
//! let mut builder = CallTreeBuilder::new();
//! builder.start_execution(
//!     ExecutionContext::default(), &precompiles, false, sender, contract, &[], 100_000, None,
//! );
//! builder.enter(CallOperation::StaticCall, contract, Address::with_last_byte(1), &[], 3_000, None)?;
//! builder.exit(&[], 3_000, None)?;
//! let records = builder.finish_execution(&[], 25_000, Duration::ZERO, None)?;
//!
//! // The precompile call was elided
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].subtraces, 0);
//!
//! let sink = Arc::new(MemorySink::new());
//! let report = TraceEmitter::new(sink.clone()).emit(&records);
//! assert!(report.is_complete());
//! # Ok::<(), revm_parity_trace::errors::TracerError>(())
//! ```
//!
//! ## Module Structure
//!
//! - `inspectors`: revm inspector and the call-tree builder behind it
//! - `emitter`: Hands finished records to a sink
//! - `sinks`: Sink implementations
//! - `config`: Precompile rules by block and trace log layout
//! - `types`: Trace records and related data structures
//! - `traits`: Trait definitions for extensibility
//! - `errors`: Error types and handling
//! - `utils`: Helper functions

pub mod config;
pub mod emitter;
pub mod errors;
pub mod inspectors;
pub mod sinks;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export only the essential types and functions
pub use config::{HardforkSchedule, PartitionConfig};
pub use emitter::{EmitReport, TraceEmitter};
pub use inspectors::{CallTreeBuilder, ParityInspector, ParityTraceOutput};
pub use traits::{PrecompileResolver, Reset, TraceOutput, TraceSink};
pub use types::{ExecutionContext, TraceRecord};
