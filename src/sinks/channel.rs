use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::errors::SinkError;
use crate::traits::TraceSink;
use crate::types::TraceRecord;

/// Forwards records to an async consumer over an unbounded channel
///
/// Sending never blocks the traced execution. Records from one tracer keep
/// their order; records from concurrent tracers interleave per record.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<TraceRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<TraceRecord>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: UnboundedSender<TraceRecord>) -> Self {
        Self { sender }
    }
}

impl TraceSink for ChannelSink {
    fn write_record(&self, record: &TraceRecord) -> Result<(), SinkError> {
        self.sender
            .send(record.clone())
            .map_err(|_| SinkError::Closed)
    }
}
