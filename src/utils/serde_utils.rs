//! Serialization helpers for the trace log wire format

use serde::Serializer;

/// Serializes a gas quantity as a `0x`-prefixed hex string without leading zeros
pub fn serialize_hex_u64<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:#x}"))
}

/// Serializes the last-trace marker as `1` or `0`
pub fn serialize_last_trace<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        #[serde(serialize_with = "serialize_hex_u64")]
        gas: u64,
        #[serde(serialize_with = "serialize_last_trace")]
        last: bool,
    }

    #[test]
    fn test_wire_encoding() {
        let json = serde_json::to_value(Sample { gas: 21000, last: true }).unwrap();
        assert_eq!(json, serde_json::json!({ "gas": "0x5208", "last": 1 }));

        let json = serde_json::to_value(Sample { gas: 0, last: false }).unwrap();
        assert_eq!(json, serde_json::json!({ "gas": "0x0", "last": 0 }));
    }
}
