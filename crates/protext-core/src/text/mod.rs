//! The line-oriented text form of a decoded message.
//!
//! ## Grammar
//!
//! ```text
//! entry         := fieldNum ":" wireType [typeSpecifier] "::" value
//! fieldNum      := decimal digits
//! wireType      := "0" | "1" | "2" | "5"
//! typeSpecifier := "D" | "F" | "B" | "N"
//! value         := signed-integer | float-literal | hex-digits | quoted-string | nested-block
//! nested-block  := "{" NEWLINE entry (NEWLINE entry)* NEWLINE "}"
//! ```
//!
//! For example:
//!
//! ```text
//! 1:0::150
//! 2:1D::2.5
//! 3:2::"hello"
//! 4:2B::00ff10
//! 5:2N::{
//!   1:5F::0.75
//! }
//! ```
//!
//! Decoding builds a tree of [`Field`]s which [`writer::TextWriter`] renders.
//! Encoding goes the other way through [`parser::parse_entries`].

pub mod parser;
pub mod writer;

use crate::decode::wire::WireType;
use crate::error::{Error, Result};
use std::fmt;

pub use parser::{parse_entries, FieldEntry};
pub use writer::{FieldVisitor, StatsVisitor, TextWriter};

/// Separator between the field header and its value
pub const VALUE_SEPARATOR: &str = "::";

/// Single-letter suffix choosing a logical interpretation for a wire type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeSpecifier {
    /// `D`: I64 as an IEEE-754 double
    Double,
    /// `F`: I32 as an IEEE-754 float
    Float,
    /// `B`: LEN as opaque bytes, written as lowercase hex
    Bytes,
    /// `N`: LEN as a nested message block
    Nested,
}

impl TypeSpecifier {
    /// Returns the letter used in the text form
    pub fn as_char(self) -> char {
        match self {
            TypeSpecifier::Double => 'D',
            TypeSpecifier::Float => 'F',
            TypeSpecifier::Bytes => 'B',
            TypeSpecifier::Nested => 'N',
        }
    }

    /// The only wire type this specifier may follow
    pub fn wire_type(self) -> WireType {
        match self {
            TypeSpecifier::Double => WireType::I64,
            TypeSpecifier::Float => WireType::I32,
            TypeSpecifier::Bytes | TypeSpecifier::Nested => WireType::Len,
        }
    }
}

impl TryFrom<char> for TypeSpecifier {
    type Error = Error;

    fn try_from(value: char) -> Result<Self> {
        match value {
            'D' => Ok(TypeSpecifier::Double),
            'F' => Ok(TypeSpecifier::Float),
            'B' => Ok(TypeSpecifier::Bytes),
            'N' => Ok(TypeSpecifier::Nested),
            _ => Err(Error::invalid_format(
                value.to_string(),
                "unknown type specifier",
            )),
        }
    }
}

impl fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A decoded value with its resolved interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Varint, shown as a signed 64-bit integer
    Varint(i64),
    /// I64 shown as a signed integer
    Fixed64(i64),
    /// I64 that looks like a double
    Double(f64),
    /// I32 shown as a signed integer
    Fixed32(i32),
    /// I32 that looks like a float
    Float(f32),
    /// LEN that is printable UTF-8
    String(String),
    /// LEN that is treated as opaque bytes
    Bytes(Vec<u8>),
    /// LEN that parsed as a message
    Message(Vec<Field>),
}

impl FieldValue {
    /// Wire type the value is carried in
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Varint(_) => WireType::Varint,
            FieldValue::Fixed64(_) | FieldValue::Double(_) => WireType::I64,
            FieldValue::Fixed32(_) | FieldValue::Float(_) => WireType::I32,
            FieldValue::String(_) | FieldValue::Bytes(_) | FieldValue::Message(_) => {
                WireType::Len
            }
        }
    }

    /// Specifier written after the wire type, if any
    pub fn specifier(&self) -> Option<TypeSpecifier> {
        match self {
            FieldValue::Double(_) => Some(TypeSpecifier::Double),
            FieldValue::Float(_) => Some(TypeSpecifier::Float),
            FieldValue::Bytes(_) => Some(TypeSpecifier::Bytes),
            FieldValue::Message(_) => Some(TypeSpecifier::Nested),
            _ => None,
        }
    }
}

/// One decoded field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Protobuf field number
    pub number: u32,
    /// Interpreted value
    pub value: FieldValue,
}

impl Field {
    /// Creates a new field
    pub fn new(number: u32, value: FieldValue) -> Self {
        Self { number, value }
    }

    /// Returns the `number:wireType[specifier]` header of the entry
    pub fn header(&self) -> String {
        match self.value.specifier() {
            Some(spec) => format!("{}:{}{}", self.number, self.value.wire_type(), spec),
            None => format!("{}:{}", self.number, self.value.wire_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specifier_round_trip() {
        for spec in [
            TypeSpecifier::Double,
            TypeSpecifier::Float,
            TypeSpecifier::Bytes,
            TypeSpecifier::Nested,
        ] {
            assert_eq!(TypeSpecifier::try_from(spec.as_char()).unwrap(), spec);
        }
        assert!(TypeSpecifier::try_from('X').is_err());
    }

    #[test]
    fn test_field_header() {
        assert_eq!(Field::new(1, FieldValue::Varint(42)).header(), "1:0");
        assert_eq!(Field::new(7, FieldValue::Double(2.5)).header(), "7:1D");
        assert_eq!(Field::new(3, FieldValue::Fixed32(9)).header(), "3:5");
        assert_eq!(Field::new(4, FieldValue::Message(vec![])).header(), "4:2N");
    }
}
