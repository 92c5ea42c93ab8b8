//! Core types for Parity-style call traces
//!
//! This module defines the data structures produced while tracing a transaction:
//! - Per-transaction execution context
//! - Call operations and the trace kind derived from them
//! - Trace records with their action, result and error
//! - Sequencing metadata assigned when a transaction finishes

pub use alloy::primitives::{Address, Bytes, B256, U256};
pub use revm::interpreter::{CallScheme, CreateScheme};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::utils::serde_utils::{serialize_hex_u64, serialize_last_trace};

/// Immutable metadata of the transaction being traced
///
/// Supplied once per top-level execution and copied into every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Hash of the block containing the transaction
    pub block_hash: B256,
    /// Number of the block containing the transaction
    pub block_number: u64,
    /// Hash of the transaction
    pub transaction_hash: B256,
    /// Index of the transaction within its block
    pub transaction_position: usize,
}

impl ExecutionContext {
    pub fn new(
        block_hash: B256,
        block_number: u64,
        transaction_hash: B256,
        transaction_position: usize,
    ) -> Self {
        Self {
            block_hash,
            block_number,
            transaction_hash,
            transaction_position,
        }
    }
}

/// Operation that opened a call frame
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallOperation {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
    SelfDestruct,
    /// Scheme with no Parity counterpart, kept by its lowercase name
    Other(String),
}

impl CallOperation {
    /// Lowercase opcode name, used verbatim as `callType`
    pub fn name(&self) -> &str {
        match self {
            Self::Call => "call",
            Self::CallCode => "callcode",
            Self::DelegateCall => "delegatecall",
            Self::StaticCall => "staticcall",
            Self::Create => "create",
            Self::Create2 => "create2",
            Self::SelfDestruct => "selfdestruct",
            Self::Other(name) => name,
        }
    }

    pub fn kind(&self) -> TraceKind {
        TraceKind::from(self)
    }
}

impl fmt::Display for CallOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<CallScheme> for CallOperation {
    fn from(scheme: CallScheme) -> Self {
        match scheme {
            CallScheme::Call => Self::Call,
            CallScheme::CallCode => Self::CallCode,
            CallScheme::DelegateCall => Self::DelegateCall,
            CallScheme::StaticCall => Self::StaticCall,
            #[allow(unreachable_patterns)]
            other => Self::Other(format!("{other:?}").to_lowercase()),
        }
    }
}

impl From<&CreateScheme> for CallOperation {
    fn from(scheme: &CreateScheme) -> Self {
        match scheme {
            CreateScheme::Create2 { .. } => Self::Create2,
            #[allow(unreachable_patterns)]
            _ => Self::Create,
        }
    }
}

/// Parity trace type of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Call,
    Create,
    Suicide,
    Unknown,
}

impl From<&CallOperation> for TraceKind {
    fn from(op: &CallOperation) -> Self {
        match op {
            CallOperation::Call
            | CallOperation::CallCode
            | CallOperation::DelegateCall
            | CallOperation::StaticCall => Self::Call,
            CallOperation::Create | CallOperation::Create2 => Self::Create,
            CallOperation::SelfDestruct => Self::Suicide,
            CallOperation::Other(_) => Self::Unknown,
        }
    }
}

/// Why a traced call ended abnormally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallErrorKind {
    /// The callee executed REVERT
    Revert,
    /// Execution halted (out of gas, invalid opcode, ...)
    Halt,
    /// The host reported a fatal external error
    Fatal,
}

/// Error carried by a trace record as data
///
/// A failing call is not a failure of the tracer; the message is emitted
/// in the record's `error` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    pub kind: CallErrorKind,
    pub message: String,
}

impl CallError {
    pub fn new(kind: CallErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn revert(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::Revert, message)
    }

    pub fn halt(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::Halt, message)
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Serialize for CallError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.message)
    }
}

/// Parameters of the call as seen when it was opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceAction {
    pub call_type: String,
    pub from: Address,
    pub to: Address,
    #[serde(serialize_with = "serialize_hex_u64")]
    pub gas: u64,
    pub input: Bytes,
    /// Minimal big-endian encoding, empty when no value was supplied
    pub value: Bytes,
}

/// Outcome of the call, filled when it exits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    #[serde(serialize_with = "serialize_hex_u64")]
    pub gas_used: u64,
    pub output: Bytes,
}

/// One call of a transaction in flat Parity trace form
///
/// Created when the call opens, completed when it exits, and sequenced once
/// the whole transaction has finished. `trace_address` never changes after
/// creation; `subtraces` follows children being opened and elided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub action: TraceAction,
    pub result: TraceResult,
    pub subtraces: usize,
    pub trace_address: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
    pub block_hash: B256,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub transaction_position: usize,
    #[serde(rename = "transactionTraceID")]
    pub transaction_trace_id: usize,
    #[serde(serialize_with = "serialize_last_trace")]
    pub transaction_last_trace: bool,
    /// Arena index of the enclosing call, `None` for the root
    #[serde(skip)]
    pub(crate) parent: Option<usize>,
}

impl TraceRecord {
    /// Index of the parent record in the builder's arena
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.trace_address.is_empty()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Minimal big-endian encoding of a transferred value
///
/// `None` and zero both encode to an empty byte string.
pub fn encode_value(value: Option<U256>) -> Bytes {
    match value {
        Some(value) => {
            let bytes = value.to_be_bytes::<32>();
            let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
            Bytes::copy_from_slice(&bytes[start..])
        }
        None => Bytes::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_kind_mapping() {
        assert_eq!(CallOperation::Call.kind(), TraceKind::Call);
        assert_eq!(CallOperation::CallCode.kind(), TraceKind::Call);
        assert_eq!(CallOperation::DelegateCall.kind(), TraceKind::Call);
        assert_eq!(CallOperation::StaticCall.kind(), TraceKind::Call);
        assert_eq!(CallOperation::Create.kind(), TraceKind::Create);
        assert_eq!(CallOperation::Create2.kind(), TraceKind::Create);
        assert_eq!(CallOperation::SelfDestruct.kind(), TraceKind::Suicide);
        assert_eq!(
            CallOperation::Other("extcall".to_string()).kind(),
            TraceKind::Unknown
        );
    }

    #[test]
    fn test_operation_from_schemes() {
        assert_eq!(CallOperation::from(CallScheme::DelegateCall).name(), "delegatecall");
        assert_eq!(CallOperation::from(CallScheme::StaticCall).name(), "staticcall");
        assert_eq!(CallOperation::from(&CreateScheme::Create), CallOperation::Create);
        assert_eq!(
            CallOperation::from(&CreateScheme::Create2 { salt: U256::from(7) }),
            CallOperation::Create2
        );
    }

    #[test]
    fn test_encode_value() {
        assert!(encode_value(None).is_empty());
        assert!(encode_value(Some(U256::ZERO)).is_empty());
        assert_eq!(encode_value(Some(U256::from(0x01_00u64))).as_ref(), &[0x01, 0x00]);
        assert_eq!(encode_value(Some(U256::MAX)).len(), 32);
    }

    #[test]
    fn test_call_error_serializes_as_message() {
        let error = CallError::revert("execution reverted");
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!("execution reverted")
        );
    }
}
