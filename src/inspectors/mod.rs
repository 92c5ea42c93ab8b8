//! EVM execution inspectors
//!
//! - `parity_inspector`: Records every call of a transaction as flat
//!   Parity trace records and writes them to a sink

pub mod parity_inspector;

pub use parity_inspector::*;
