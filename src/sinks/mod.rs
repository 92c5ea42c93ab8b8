//! Trace sink implementations
//!
//! - `MemorySink`: Collects records in memory
//! - `JsonLinesSink`: One JSON object per line on any writer
//! - `PartitionedFileSink`: JSON lines in block-partitioned log files
//! - `ChannelSink`: Forwards records to an async consumer
//!
//! Every sink serializes concurrent writers internally, so one instance can
//! be shared by tracers running on different threads.

mod channel;
mod json_lines;
mod memory;
mod partitioned;

pub use channel::ChannelSink;
pub use json_lines::JsonLinesSink;
pub use memory::MemorySink;
pub use partitioned::PartitionedFileSink;
