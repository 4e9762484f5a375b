//! Encoding the text form back into protobuf wire bytes.
//!
//! Encoding is two-pass. Every entry is first parsed and classified into a
//! prepared field tree (see [`rules`]); the exact payload size is computed
//! from that tree so the envelope header can be written first, and then the
//! fields are written. Any failure discards the partial output.

mod rules;

use crate::envelope::{write_header, HEADER_LEN};
use crate::error::{Error, Result};
use crate::text::{parse_entries, FieldEntry};
use crate::DEFAULT_MAX_DEPTH;
use bytes::BytesMut;
use rules::{message_len, prepare_fields, write_message};
use tracing::debug;

/// Configuration for the encoder
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Deepest nested block that may be encoded. Deeper blocks fail the
    /// call with [`Error::RecursionLimit`].
    pub max_depth: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EncoderConfig {
    /// Creates a new encoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Encodes text entries into protobuf messages
#[derive(Debug, Clone, Default)]
pub struct MessageEncoder {
    config: EncoderConfig,
}

impl MessageEncoder {
    /// Creates a new encoder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new encoder with custom configuration
    pub fn with_config(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Returns the encoder configuration
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Parses `text` and encodes it as an enveloped message.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let entries = parse_entries(text)?;
        self.encode_entries(&entries)
    }

    /// Encodes entries as an enveloped message.
    pub fn encode_entries(&self, entries: &[FieldEntry]) -> Result<Vec<u8>> {
        let fields = prepare_fields(entries, 0, &self.config)?;
        let payload_len = message_len(&fields);
        let total = payload_len + HEADER_LEN;

        let mut buf = BytesMut::with_capacity(total);
        write_header(&mut buf, payload_len)?;
        write_message(&fields, &mut buf);

        if buf.len() != total {
            return Err(Error::internal(format!(
                "computed {} bytes but wrote {}",
                total,
                buf.len()
            )));
        }

        debug!("Encoded {} entries into {} bytes", entries.len(), total);
        Ok(buf.to_vec())
    }

    /// Parses `text` and encodes it as a bare payload with no envelope.
    pub fn encode_payload(&self, text: &str) -> Result<Vec<u8>> {
        let entries = parse_entries(text)?;
        let fields = prepare_fields(&entries, 0, &self.config)?;

        let mut buf = BytesMut::with_capacity(message_len(&fields));
        write_message(&fields, &mut buf);
        Ok(buf.to_vec())
    }

    /// Returns the payload size `entries` encode to, without the envelope.
    pub fn compute_size(&self, entries: &[FieldEntry]) -> Result<usize> {
        prepare_fields(entries, 0, &self.config).map(|fields| message_len(&fields))
    }
}
