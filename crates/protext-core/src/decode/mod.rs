//! Decoding protobuf wire bytes into the text form.
//!
//! ## Algorithm Overview
//!
//! 1. Strip the 5-byte envelope (see [`crate::envelope`])
//! 2. Read fields one by one with [`WireScanner`]
//! 3. Interpret each raw value:
//!    - fixed-width values become floats when [`heuristics`] says so
//!    - length-delimited values are first tried as a nested message, then
//!      as a printable string, and otherwise kept as bytes
//! 4. Render every top-level field as one (possibly multi-line) entry
//!
//! A failure while reading the top-level payload aborts the call. A failure
//! while speculatively reading a nested blob only means the blob is not a
//! message.

pub mod heuristics;
pub mod wire;

use crate::envelope::split_envelope;
use crate::error::Result;
use crate::text::writer::render_field;
use crate::text::{Field, FieldValue};
use crate::DEFAULT_MAX_DEPTH;
use tracing::{debug, trace};

pub use heuristics::{is_mostly_binary, looks_like_double, looks_like_float};
pub use wire::{decode_varint, RawField, RawValue, WireScanner, WireType, MAX_VALID_NUMBER};

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Deepest nested message that is still decoded as a message. Blobs
    /// below this level are shown as strings or bytes.
    pub max_depth: usize,
    /// Indentation added per nesting level (default: 2 spaces)
    pub indent_str: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            indent_str: "  ".to_string(),
        }
    }
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }
}

/// Result of decoding one message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMessage {
    /// The interpreted fields, in wire order
    pub fields: Vec<Field>,
    /// One rendered entry per top-level field
    pub lines: Vec<String>,
    /// The entries joined with newlines
    pub text: String,
}

impl DecodedMessage {
    /// Returns true if the message has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Outcome of trying to read a length-delimited blob as a message
#[derive(Debug, Clone, PartialEq)]
pub enum NestedDecodeResult {
    /// The blob is a well-formed message
    Message(Vec<Field>),
    /// The blob should be treated as a string or bytes
    NotAMessage,
}

/// Decodes protobuf messages without a schema
#[derive(Debug, Clone, Default)]
pub struct MessageDecoder {
    config: DecoderConfig,
}

impl MessageDecoder {
    /// Creates a new decoder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the decoder configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes an enveloped message.
    ///
    /// Empty input yields an empty message.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedMessage> {
        if data.is_empty() {
            return Ok(DecodedMessage::default());
        }
        let payload = split_envelope(data)?;
        self.decode_payload(payload)
    }

    /// Decodes a bare protobuf payload with no envelope.
    pub fn decode_payload(&self, payload: &[u8]) -> Result<DecodedMessage> {
        let fields = self.decode_fields(payload)?;
        let lines: Vec<String> = fields
            .iter()
            .map(|field| render_field(field, &self.config.indent_str))
            .collect();
        let text = lines.join("\n");

        debug!(
            "Decoded {} top-level fields from {} bytes",
            fields.len(),
            payload.len()
        );

        Ok(DecodedMessage {
            fields,
            lines,
            text,
        })
    }

    /// Decodes a bare payload into the field tree without rendering it.
    pub fn decode_fields(&self, payload: &[u8]) -> Result<Vec<Field>> {
        WireScanner::new(payload)
            .map(|raw| raw.map(|raw| self.interpret(raw, 0)))
            .collect()
    }

    /// Tries to read `data` as a message nested `depth` levels deep.
    ///
    /// Any malformed tag, unknown wire type, zero field number, truncation
    /// or non-canonical varint makes the blob "not a message". Empty blobs
    /// and blobs past the maximum depth are never messages.
    pub fn try_decode_nested(&self, data: &[u8], depth: usize) -> NestedDecodeResult {
        if data.is_empty() {
            return NestedDecodeResult::NotAMessage;
        }
        if depth > self.config.max_depth {
            trace!("Not descending past depth {}", self.config.max_depth);
            return NestedDecodeResult::NotAMessage;
        }

        let mut fields = Vec::new();
        for raw in WireScanner::new(data) {
            match raw {
                Ok(raw) if raw.canonical => fields.push(self.interpret(raw, depth)),
                Ok(raw) => {
                    trace!("Field {} uses a non-canonical varint", raw.number);
                    return NestedDecodeResult::NotAMessage;
                }
                Err(e) => {
                    trace!("{} byte blob is not a nested message: {}", data.len(), e);
                    return NestedDecodeResult::NotAMessage;
                }
            }
        }
        NestedDecodeResult::Message(fields)
    }

    fn interpret(&self, raw: RawField<'_>, depth: usize) -> Field {
        let value = match raw.value {
            RawValue::Varint(v) => FieldValue::Varint(v as i64),
            RawValue::I64(bits) if looks_like_double(bits) => FieldValue::Double(f64::from_bits(bits)),
            RawValue::I64(bits) => FieldValue::Fixed64(bits as i64),
            RawValue::I32(bits) if looks_like_float(bits) => FieldValue::Float(f32::from_bits(bits)),
            RawValue::I32(bits) => FieldValue::Fixed32(bits as i32),
            RawValue::Len(bytes) => self.interpret_len(bytes, depth),
        };
        Field::new(raw.number, value)
    }

    fn interpret_len(&self, bytes: &[u8], depth: usize) -> FieldValue {
        if let NestedDecodeResult::Message(children) = self.try_decode_nested(bytes, depth + 1) {
            return FieldValue::Message(children);
        }
        // Line breaks would split the entry, so such strings go out as hex
        match std::str::from_utf8(bytes) {
            Ok(s) if !s.contains(['\n', '\r']) && !is_mostly_binary(s) => {
                FieldValue::String(s.to_string())
            }
            _ => FieldValue::Bytes(bytes.to_vec()),
        }
    }
}
