//! Property tests for the envelope and re-encoding invariants.

use proptest::prelude::*;
use protext_core::decode::decode_varint;
use protext_core::{decode, encode, MessageDecoder, MessageEncoder};

/// One text entry built from a generated value
fn entry() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..2000, any::<i64>()).prop_map(|(n, v)| format!("{}:0::{}", n, v)),
        (1u32..2000, any::<i64>()).prop_map(|(n, v)| format!("{}:1::{}", n, v)),
        (1u32..2000, any::<i32>()).prop_map(|(n, v)| format!("{}:5::{}", n, v)),
        (1u32..2000, -1.0e12f64..1.0e12).prop_map(|(n, v)| format!("{}:1D::{:?}", n, v)),
        (1u32..2000, "[a-zA-Z0-9 _.-]{0,32}").prop_map(|(n, s)| format!("{}:2::\"{}\"", n, s)),
        (1u32..2000, proptest::collection::vec(any::<u8>(), 0..24))
            .prop_map(|(n, b)| format!("{}:2B::{}", n, hex_string(&b))),
    ]
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn message_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(entry(), 0..8).prop_map(|entries| entries.join("\n"))
}

proptest! {
    #[test]
    fn envelope_length_matches_payload(text in message_text()) {
        let bytes = encode(&text).unwrap();
        let declared = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
        prop_assert_eq!(bytes[0], 0);
        prop_assert_eq!(declared, bytes.len() - 5);
    }

    #[test]
    fn decoded_text_re_encodes_to_the_same_bytes(text in message_text()) {
        let bytes = encode(&text).unwrap();
        let decoded = decode(&bytes).unwrap();
        prop_assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn nested_blocks_re_encode_to_the_same_bytes(inner in message_text(), number in 1u32..100) {
        let text = format!("{}:2N::{{\n{}\n}}", number, inner);
        let bytes = encode(&text).unwrap();
        let decoded = decode(&bytes).unwrap();
        prop_assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn arbitrary_bytes_never_panic(payload in proptest::collection::vec(any::<u8>(), 0..64)) {
        if let Ok(decoded) = MessageDecoder::new().decode_payload(&payload) {
            let encoded = MessageEncoder::new().encode_payload(&decoded.text).unwrap();
            let again = MessageDecoder::new().decode_payload(&encoded).unwrap();
            prop_assert_eq!(again.text, decoded.text);
        }
    }

    #[test]
    fn varints_match_prost(value in any::<u64>()) {
        let mut buf = Vec::new();
        prost::encoding::encode_varint(value, &mut buf);
        prop_assert_eq!(decode_varint(&buf).unwrap(), (value, buf.len()));
    }
}
