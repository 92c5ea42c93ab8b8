//! Revert reason decoding for trace records
//!
//! Failed calls carry their error as data in the emitted record. This module
//! turns raw revert output into the message written there:
//! - Revert with string message (`Error(string)`)
//! - Solidity panic codes (`Panic(uint256)`)
//! - Anything else falls back to the plain "execution reverted" text

use alloy::dyn_abi::{DynSolType, DynSolValue};

/// Message used for every revert, optionally followed by the decoded reason
pub const EXECUTION_REVERTED: &str = "execution reverted";

/// Decode the reason carried by revert output
///
/// Handles the two standard encodings:
/// 1. Error(string) - Standard revert with message (selector: 0x08c379a0)
/// 2. Panic(uint256) - Solidity panic with error code (selector: 0x4e487b71)
///
/// # Returns
/// * `Some(String)` - Decoded message or panic description
/// * `None` - If the output is not one of the standard encodings
pub fn decode_revert_reason(output: &[u8]) -> Option<String> {
    if output.len() < 4 {
        return None;
    }

    match &output[0..4] {
        [0x08, 0xc3, 0x79, 0xa0] => match DynSolType::String.abi_decode(&output[4..]) {
            Ok(DynSolValue::String(reason)) => Some(reason),
            _ => None,
        },
        [0x4e, 0x48, 0x7b, 0x71] => match DynSolType::Uint(256).abi_decode(&output[4..]) {
            Ok(DynSolValue::Uint(code, _)) => {
                let code = code.saturating_to::<u64>();
                Some(format!("panic: {} (0x{code:x})", panic_description(code)))
            }
            _ => None,
        },
        _ => None,
    }
}

fn panic_description(code: u64) -> &'static str {
    match code {
        0x00 => "generic compiler panic",
        0x01 => "assertion failed",
        0x11 => "arithmetic underflow or overflow",
        0x12 => "division or modulo by zero",
        0x21 => "enum overflow",
        0x22 => "invalid encoded storage byte array accessed",
        0x31 => "out-of-bounds array access; popping on an empty array",
        0x32 => "out-of-bounds access of an array or bytesN",
        0x41 => "out of memory",
        0x51 => "uninitialized function",
        _ => "unknown panic code",
    }
}

/// Full error message for a reverted call
///
/// ```
/// use revm_parity_trace::utils::error_utils::revert_message;
/// assert_eq!(revert_message(&[]), "execution reverted");
/// ```
pub fn revert_message(output: &[u8]) -> String {
    match decode_revert_reason(output) {
        Some(reason) => format!("{EXECUTION_REVERTED}: {reason}"),
        None => EXECUTION_REVERTED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::hex::decode;

    fn encoded_insufficient_balance() -> Vec<u8> {
        decode(
            "08c379a0\
             0000000000000000000000000000000000000000000000000000000000000020\
             0000000000000000000000000000000000000000000000000000000000000014\
             496e73756666696369656e742062616c616e6365000000000000000000000000",
        )
        .unwrap()
    }

    #[test]
    fn test_decode_error_string() {
        let output = encoded_insufficient_balance();
        assert_eq!(
            decode_revert_reason(&output),
            Some("Insufficient balance".to_string())
        );
        assert_eq!(
            revert_message(&output),
            "execution reverted: Insufficient balance"
        );

        let truncated = decode("08c379a0").unwrap();
        assert_eq!(decode_revert_reason(&truncated), None);
    }

    #[test]
    fn test_decode_panic() {
        let mut output = vec![0x4e, 0x48, 0x7b, 0x71];
        output.extend_from_slice(&[0u8; 31]);
        output.push(0x11);

        assert_eq!(
            revert_message(&output),
            "execution reverted: panic: arithmetic underflow or overflow (0x11)"
        );
    }

    #[test]
    fn test_unrecognised_output() {
        assert_eq!(decode_revert_reason(&[]), None);
        assert_eq!(decode_revert_reason(&[0x08, 0xc3, 0x79]), None);
        assert_eq!(revert_message(&[0xde, 0xad, 0xbe, 0xef]), EXECUTION_REVERTED);
        assert_eq!(decode_revert_reason(&[0x4e, 0x48, 0x7b, 0x71, 0x00]), None);
    }
}
