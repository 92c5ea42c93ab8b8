//! Helper functions shared by the tracer
//!
//! # Modules
//!
//! - [`error_utils`]: Revert reason decoding
//!   - `Error(string)` messages
//!   - Solidity panic code interpretation
//!
//! - [`serde_utils`]: Wire encoding helpers for trace records

/// Revert reason decoding utilities
pub mod error_utils;

/// Serialization helpers
pub mod serde_utils;
