//! Per-field encoding rules.
//!
//! Each text entry is matched against [`RULES`] by wire type and specifier,
//! and the matching rule turns its value into a [`Payload`]. Sizing and
//! writing are both methods on that one prepared payload, so the size pass
//! and the write pass see the same decisions, including the fallback for
//! nested blocks that do not parse.

use super::EncoderConfig;
use crate::decode::wire::{make_tag, WireType};
use crate::error::{Error, Result};
use crate::text::{parse_entries, FieldEntry, TypeSpecifier};
use bytes::BufMut;
use prost::encoding::{encode_varint, encoded_len_varint};
use tracing::trace;

type PrepareFn = fn(&FieldEntry, usize, &EncoderConfig) -> Result<Payload>;

/// Maps an entry kind to the function that prepares its payload
struct FieldRule {
    wire_type: WireType,
    specifier: Option<TypeSpecifier>,
    prepare: PrepareFn,
}

static RULES: [FieldRule; 8] = [
    FieldRule {
        wire_type: WireType::Varint,
        specifier: None,
        prepare: prepare_varint,
    },
    FieldRule {
        wire_type: WireType::I64,
        specifier: None,
        prepare: prepare_fixed64,
    },
    FieldRule {
        wire_type: WireType::I64,
        specifier: Some(TypeSpecifier::Double),
        prepare: prepare_double,
    },
    FieldRule {
        wire_type: WireType::I32,
        specifier: None,
        prepare: prepare_fixed32,
    },
    FieldRule {
        wire_type: WireType::I32,
        specifier: Some(TypeSpecifier::Float),
        prepare: prepare_float,
    },
    FieldRule {
        wire_type: WireType::Len,
        specifier: None,
        prepare: prepare_string,
    },
    FieldRule {
        wire_type: WireType::Len,
        specifier: Some(TypeSpecifier::Bytes),
        prepare: prepare_bytes,
    },
    FieldRule {
        wire_type: WireType::Len,
        specifier: Some(TypeSpecifier::Nested),
        prepare: prepare_nested,
    },
];

/// A value ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Payload {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Bytes(Vec<u8>),
    Message(Vec<PreparedField>),
}

impl Payload {
    /// Bytes taken by the value, including any length prefix
    fn encoded_len(&self) -> usize {
        match self {
            Payload::Varint(v) => encoded_len_varint(*v),
            Payload::Fixed64(_) => 8,
            Payload::Fixed32(_) => 4,
            Payload::Bytes(b) => encoded_len_varint(b.len() as u64) + b.len(),
            Payload::Message(fields) => {
                let inner = message_len(fields);
                encoded_len_varint(inner as u64) + inner
            }
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        match self {
            Payload::Varint(v) => encode_varint(*v, buf),
            Payload::Fixed64(v) => buf.put_u64_le(*v),
            Payload::Fixed32(v) => buf.put_u32_le(*v),
            Payload::Bytes(b) => {
                encode_varint(b.len() as u64, buf);
                buf.put_slice(b);
            }
            Payload::Message(fields) => {
                encode_varint(message_len(fields) as u64, buf);
                write_message(fields, buf);
            }
        }
    }
}

/// A field whose value has been parsed and classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PreparedField {
    number: u32,
    wire_type: WireType,
    payload: Payload,
}

impl PreparedField {
    fn tag(&self) -> u64 {
        make_tag(self.number, self.wire_type)
    }

    fn encoded_len(&self) -> usize {
        encoded_len_varint(self.tag()) + self.payload.encoded_len()
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        encode_varint(self.tag(), buf);
        self.payload.write(buf);
    }
}

/// Exact encoded size of a list of prepared fields
pub(crate) fn message_len(fields: &[PreparedField]) -> usize {
    fields.iter().map(PreparedField::encoded_len).sum()
}

/// Writes prepared fields in order
pub(crate) fn write_message<B: BufMut>(fields: &[PreparedField], buf: &mut B) {
    for field in fields {
        field.write(buf);
    }
}

/// Prepares entries belonging to a message `depth` levels deep.
pub(crate) fn prepare_fields(
    entries: &[FieldEntry],
    depth: usize,
    config: &EncoderConfig,
) -> Result<Vec<PreparedField>> {
    entries
        .iter()
        .map(|entry| prepare_field(entry, depth, config))
        .collect()
}

fn prepare_field(entry: &FieldEntry, depth: usize, config: &EncoderConfig) -> Result<PreparedField> {
    let rule = RULES
        .iter()
        .find(|rule| rule.wire_type == entry.wire_type && rule.specifier == entry.specifier)
        .ok_or_else(|| {
            Error::invalid_format(
                &entry.value,
                format!("no encoding for wire type {}", entry.wire_type),
            )
        })?;

    Ok(PreparedField {
        number: entry.number,
        wire_type: entry.wire_type,
        payload: (rule.prepare)(entry, depth, config)?,
    })
}

/// Parses a signed literal, or an unsigned one above the signed range, into
/// its 64-bit pattern.
fn parse_u64_bits(value: &str) -> Result<u64> {
    value
        .parse::<i64>()
        .map(|v| v as u64)
        .or_else(|_| value.parse::<u64>())
        .map_err(|_| Error::invalid_format(value, "not a valid 64-bit integer"))
}

fn parse_u32_bits(value: &str) -> Result<u32> {
    value
        .parse::<i32>()
        .map(|v| v as u32)
        .or_else(|_| value.parse::<u32>())
        .map_err(|_| Error::invalid_format(value, "not a valid 32-bit integer"))
}

fn prepare_varint(entry: &FieldEntry, _depth: usize, _config: &EncoderConfig) -> Result<Payload> {
    parse_u64_bits(&entry.value).map(Payload::Varint)
}

fn prepare_fixed64(entry: &FieldEntry, _depth: usize, _config: &EncoderConfig) -> Result<Payload> {
    parse_u64_bits(&entry.value).map(Payload::Fixed64)
}

fn prepare_double(entry: &FieldEntry, _depth: usize, _config: &EncoderConfig) -> Result<Payload> {
    entry
        .value
        .parse::<f64>()
        .map(|v| Payload::Fixed64(v.to_bits()))
        .map_err(|_| Error::invalid_format(&entry.value, "not a valid double"))
}

fn prepare_fixed32(entry: &FieldEntry, _depth: usize, _config: &EncoderConfig) -> Result<Payload> {
    parse_u32_bits(&entry.value).map(Payload::Fixed32)
}

fn prepare_float(entry: &FieldEntry, _depth: usize, _config: &EncoderConfig) -> Result<Payload> {
    entry
        .value
        .parse::<f32>()
        .map(|v| Payload::Fixed32(v.to_bits()))
        .map_err(|_| Error::invalid_format(&entry.value, "not a valid float"))
}

fn prepare_bytes(entry: &FieldEntry, _depth: usize, _config: &EncoderConfig) -> Result<Payload> {
    Ok(Payload::Bytes(hex::decode(&entry.value)?))
}

/// Strips exactly one pair of enclosing double quotes.
fn unquote(value: &str) -> Result<&str> {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| Error::UnquotedString {
            value: value.to_string(),
        })
}

fn prepare_string(entry: &FieldEntry, _depth: usize, _config: &EncoderConfig) -> Result<Payload> {
    unquote(&entry.value).map(|s| Payload::Bytes(s.as_bytes().to_vec()))
}

fn prepare_nested(entry: &FieldEntry, depth: usize, config: &EncoderConfig) -> Result<Payload> {
    let body_depth = depth + 1;
    if body_depth > config.max_depth {
        return Err(Error::RecursionLimit {
            max: config.max_depth,
        });
    }

    let prepared = entry
        .nested_body()
        .ok_or_else(|| Error::invalid_format(&entry.value, "nested value must be enclosed in braces"))
        .and_then(parse_entries)
        .and_then(|entries| prepare_fields(&entries, body_depth, config));

    match prepared {
        Ok(fields) => Ok(Payload::Message(fields)),
        Err(e) if e.is_recoverable() => {
            trace!(
                "Field {} is not a valid nested message, writing it as a string: {}",
                entry.number,
                e
            );
            Ok(Payload::Bytes(entry.value.as_bytes().to_vec()))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> FieldEntry {
        text.parse().unwrap()
    }

    fn encode_one(text: &str) -> Vec<u8> {
        let field = prepare_field(&entry(text), 0, &EncoderConfig::default()).unwrap();
        let mut buf = Vec::new();
        field.write(&mut buf);
        assert_eq!(buf.len(), field.encoded_len());
        buf
    }

    #[test]
    fn test_every_rule_is_unique() {
        for (i, a) in RULES.iter().enumerate() {
            for b in &RULES[i + 1..] {
                assert!(a.wire_type != b.wire_type || a.specifier != b.specifier);
            }
        }
    }

    #[test]
    fn test_varint_rules() {
        assert_eq!(encode_one("1:0::42"), [0x08, 0x2A]);
        assert_eq!(encode_one("1:0::300"), [0x08, 0xAC, 0x02]);
        let mut expected = vec![0x08];
        expected.extend([0xFF; 9]);
        expected.push(0x01);
        assert_eq!(encode_one("1:0::-1"), expected);
        assert_eq!(encode_one("1:0::18446744073709551615"), expected);
    }

    #[test]
    fn test_fixed_rules() {
        let mut expected = vec![0x09];
        expected.extend(2.5f64.to_bits().to_le_bytes());
        assert_eq!(encode_one("1:1D::2.5"), expected);

        let mut expected = vec![0x09];
        expected.extend((-2i64).to_le_bytes());
        assert_eq!(encode_one("1:1::-2"), expected);

        let mut expected = vec![0x0D];
        expected.extend(0.75f32.to_bits().to_le_bytes());
        assert_eq!(encode_one("1:5F::0.75"), expected);

        assert_eq!(encode_one("1:5::4294967295"), [0x0D, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_string_and_bytes_rules() {
        assert_eq!(encode_one("2:2::\"hi\""), [0x12, 0x02, b'h', b'i']);
        assert_eq!(encode_one("2:2::\"a\"b\""), [0x12, 0x03, b'a', b'"', b'b']);
        assert_eq!(encode_one("2:2::\"\""), [0x12, 0x00]);
        assert_eq!(encode_one("3:2B::00FF"), [0x1A, 0x02, 0x00, 0xFF]);
    }

    #[test]
    fn test_string_must_be_quoted() {
        let config = EncoderConfig::default();
        for text in ["2:2::hi", "2:2::\"hi", "2:2::\""] {
            assert!(matches!(
                prepare_field(&entry(text), 0, &config),
                Err(Error::UnquotedString { .. })
            ));
        }
    }

    #[test]
    fn test_odd_hex_rejected() {
        let err = prepare_field(&entry("3:2B::abc"), 0, &EncoderConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid hex string: odd length");
    }

    #[test]
    fn test_nested_rule() {
        let nested = entry("3:2N::{\n1:0::150\n2:2::\"abc\"\n}");
        let field = prepare_field(&nested, 0, &EncoderConfig::default()).unwrap();
        let mut buf = Vec::new();
        field.write(&mut buf);
        assert_eq!(
            buf,
            [0x1A, 0x08, 0x08, 0x96, 0x01, 0x12, 0x03, b'a', b'b', b'c']
        );
        assert_eq!(field.encoded_len(), buf.len());
    }

    #[test]
    fn test_unparsable_nested_falls_back_to_string() {
        let nested = entry("3:2N::{\n1:0::not-a-number\n}");
        let field = prepare_field(&nested, 0, &EncoderConfig::default()).unwrap();
        assert_eq!(
            field.payload,
            Payload::Bytes(b"{\n1:0::not-a-number\n}".to_vec())
        );
        let mut buf = Vec::new();
        field.write(&mut buf);
        assert_eq!(buf.len(), field.encoded_len());
    }

    #[test]
    fn test_nesting_limit_fails_closed() {
        let config = EncoderConfig::new().max_depth(1);
        let nested = entry("1:2N::{\n1:2N::{\n1:0::1\n}\n}");
        assert_eq!(
            prepare_field(&nested, 0, &config),
            Err(Error::RecursionLimit { max: 1 })
        );
        let shallow = entry("1:2N::{\n1:0::1\n}");
        assert!(prepare_field(&shallow, 0, &config).is_ok());
    }
}
