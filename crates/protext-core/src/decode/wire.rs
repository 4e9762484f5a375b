//! Low-level protobuf wire format reading.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 5: I32 (fixed32, sfixed32, float)
//!
//! The legacy group wire types (3 and 4) and the unassigned values 6 and 7
//! are rejected.

use crate::error::{Error, Result};
use prost::encoding::encoded_len_varint;
use std::fmt;

/// Protobuf wire types understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// 32-bit fixed-width
    I32 = 5,
}

impl WireType {
    /// Returns the numeric wire type as it appears in a tag
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u64> for WireType {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::I32),
            _ => Err(Error::InvalidWireType { wire_type: value }),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_VALID_NUMBER: u32 = 536_870_911;

/// Builds the tag varint for a field number and wire type.
pub fn make_tag(number: u32, wire_type: WireType) -> u64 {
    (u64::from(number) << 3) | u64::from(wire_type.as_u8())
}

/// Decode a varint from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            // Varints are at most 10 bytes for a 64-bit value
            return Err(Error::varint_decode(i));
        }
        if i == 9 && byte > 0x01 {
            // Only one bit of a 64-bit value is left for the tenth byte
            return Err(Error::varint_decode(i));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::varint_decode(data.len()))
}

/// A field value as it sits on the wire, before any interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue<'a> {
    /// Wire type 0
    Varint(u64),
    /// Wire type 1, little-endian bytes already assembled
    I64(u64),
    /// Wire type 2 payload
    Len(&'a [u8]),
    /// Wire type 5, little-endian bytes already assembled
    I32(u32),
}

/// A single field read from the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawField<'a> {
    /// Field number (1..=MAX_VALID_NUMBER)
    pub number: u32,
    /// The uninterpreted value
    pub value: RawValue<'a>,
    /// Whether every varint in the field (tag, value, length) used its
    /// shortest encoding
    pub canonical: bool,
}

impl RawField<'_> {
    /// Returns the wire type of the field
    pub fn wire_type(&self) -> WireType {
        match self.value {
            RawValue::Varint(_) => WireType::Varint,
            RawValue::I64(_) => WireType::I64,
            RawValue::Len(_) => WireType::Len,
            RawValue::I32(_) => WireType::I32,
        }
    }
}

/// Reads fields one at a time from a protobuf payload.
///
/// The scanner is an iterator over `Result<RawField>`; after the first
/// error it yields nothing more.
#[derive(Debug, Clone)]
pub struct WireScanner<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> WireScanner<'a> {
    /// Creates a scanner positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current byte offset into the payload
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns true once every byte has been consumed
    pub fn is_finished(&self) -> bool {
        self.position >= self.data.len()
    }

    fn read_varint(&mut self, what: &str) -> Result<(u64, bool)> {
        let start = self.position;
        let remaining = self.data.get(start..).unwrap_or_default();
        let (value, len) = decode_varint(remaining).map_err(|_| {
            Error::invalid_wire_format(start, format!("failed to decode {}", what))
        })?;
        self.position += len;
        Ok((value, encoded_len_varint(value) == len))
    }

    fn read_fixed<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let start = self.position;
        let bytes = self
            .data
            .get(start..start + N)
            .ok_or_else(|| Error::invalid_wire_format(start, format!("not enough bytes for {}", what)))?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.position += N;
        Ok(out)
    }

    /// Consume a single protobuf field.
    pub fn read_field(&mut self) -> Result<RawField<'a>> {
        if self.is_finished() {
            return Err(Error::invalid_wire_format(self.position, "no data left"));
        }

        let (tag, tag_canonical) = self.read_varint("field tag")?;
        let wire_type = WireType::try_from(tag & 0x07)?;
        let number = tag >> 3;

        if number == 0 || number > u64::from(MAX_VALID_NUMBER) {
            return Err(Error::InvalidFieldNumber {
                number,
                max: MAX_VALID_NUMBER,
            });
        }

        let (value, value_canonical) = match wire_type {
            WireType::Varint => {
                let (value, canonical) = self.read_varint("varint value")?;
                (RawValue::Varint(value), canonical)
            }
            WireType::I64 => {
                let bytes = self.read_fixed::<8>("I64")?;
                (RawValue::I64(u64::from_le_bytes(bytes)), true)
            }
            WireType::I32 => {
                let bytes = self.read_fixed::<4>("I32")?;
                (RawValue::I32(u32::from_le_bytes(bytes)), true)
            }
            WireType::Len => {
                let (length, canonical) = self.read_varint("length prefix")?;
                let start = self.position;
                let end = usize::try_from(length)
                    .ok()
                    .and_then(|len| start.checked_add(len))
                    .filter(|&end| end <= self.data.len())
                    .ok_or_else(|| {
                        Error::invalid_wire_format(
                            start,
                            format!(
                                "not enough bytes for LEN field (need {}, have {})",
                                length,
                                self.data.len() - start
                            ),
                        )
                    })?;
                self.position = end;
                (RawValue::Len(&self.data[start..end]), canonical)
            }
        };

        Ok(RawField {
            // Bounded by MAX_VALID_NUMBER above
            number: number as u32,
            value,
            canonical: tag_canonical && value_canonical,
        })
    }
}

impl<'a> Iterator for WireScanner<'a> {
    type Item = Result<RawField<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }
        let field = self.read_field();
        if field.is_err() {
            self.position = self.data.len();
        }
        Some(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_varint_single_byte() {
        let data = [0x08]; // Value 8
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, 8);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_decode_varint_multi_byte() {
        let data = [0xAC, 0x02]; // Value 300
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, 300);
        assert_eq!(len, 2);
    }

    #[test]
    fn test_decode_varint_max() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, u64::MAX);
        assert_eq!(len, 10);
    }

    #[test]
    fn test_decode_varint_overflow() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert!(decode_varint(&data).is_err());
    }

    #[test]
    fn test_decode_varint_truncated() {
        assert!(matches!(
            decode_varint(&[0x96]),
            Err(Error::VarintDecode { offset: 1 })
        ));
        assert!(decode_varint(&[]).is_err());
    }

    #[test]
    fn test_wire_type_conversion() {
        assert_eq!(WireType::try_from(0).unwrap(), WireType::Varint);
        assert_eq!(WireType::try_from(1).unwrap(), WireType::I64);
        assert_eq!(WireType::try_from(2).unwrap(), WireType::Len);
        assert_eq!(WireType::try_from(5).unwrap(), WireType::I32);
        for rejected in [3, 4, 6, 7] {
            assert_eq!(
                WireType::try_from(rejected),
                Err(Error::InvalidWireType { wire_type: rejected })
            );
        }
    }

    #[test]
    fn test_read_varint_field() {
        // Field 1, wire type 0 (varint), value 150
        let data = [0x08, 0x96, 0x01];
        let mut scanner = WireScanner::new(&data);
        let field = scanner.read_field().unwrap();
        assert_eq!(field.number, 1);
        assert_eq!(field.value, RawValue::Varint(150));
        assert!(field.canonical);
        assert!(scanner.is_finished());
    }

    #[test]
    fn test_read_len_field() {
        // Field 1, wire type 2 (len), length 5, "hello"
        let data = [0x0A, 0x05, b'h', b'e', b'l', b'l', b'o'];
        let field = WireScanner::new(&data).read_field().unwrap();
        assert_eq!(field.value, RawValue::Len(b"hello"));
    }

    #[test]
    fn test_read_fixed_fields() {
        let data = [0x0D, 0x01, 0x02, 0x03, 0x04];
        let field = WireScanner::new(&data).read_field().unwrap();
        assert_eq!(field.value, RawValue::I32(0x0403_0201));

        let data = [0x09, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let field = WireScanner::new(&data).read_field().unwrap();
        assert_eq!(field.value, RawValue::I64(0x0807_0605_0403_0201));
    }

    #[test]
    fn test_truncated_fixed_and_len() {
        let data = [0x09, 0x01, 0x02];
        assert!(matches!(
            WireScanner::new(&data).read_field(),
            Err(Error::InvalidWireFormat { offset: 1, .. })
        ));

        let data = [0x0A, 0x05, b'h'];
        assert!(WireScanner::new(&data).read_field().is_err());
    }

    #[test]
    fn test_invalid_field_number() {
        let data = [0x00, 0x01];
        assert!(matches!(
            WireScanner::new(&data).read_field(),
            Err(Error::InvalidFieldNumber { number: 0, .. })
        ));
    }

    #[test]
    fn test_group_wire_type_rejected() {
        // Field 1, wire type 3 (start group)
        let data = [0x0B];
        assert_eq!(
            WireScanner::new(&data).read_field(),
            Err(Error::InvalidWireType { wire_type: 3 })
        );
    }

    #[test]
    fn test_non_canonical_varint_flagged() {
        // Field 1, value 0 padded to two bytes
        let data = [0x08, 0x80, 0x00];
        let field = WireScanner::new(&data).read_field().unwrap();
        assert_eq!(field.value, RawValue::Varint(0));
        assert!(!field.canonical);
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let data = [0x08, 0x01, 0x0B, 0x08, 0x02];
        let results: Vec<_> = WireScanner::new(&data).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_make_tag() {
        assert_eq!(make_tag(1, WireType::Varint), 0x08);
        assert_eq!(make_tag(2, WireType::Len), 0x12);
    }
}
