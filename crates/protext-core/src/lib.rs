//! # protext-core
//!
//! A schema-less codec between Protocol Buffers wire bytes and a
//! human-editable, line-oriented text form.
//!
//! This crate provides the core functionality for:
//! - Reading protobuf fields without a `.proto` schema
//! - Guessing each value's logical type (integer, float, string, bytes,
//!   nested message) from the wire bytes alone
//! - Parsing edited text and re-encoding it byte for byte
//!
//! ## Architecture
//!
//! - [`decode`]: wire reading, type heuristics and the message decoder
//! - [`text`]: the field model, the text renderer and the text parser
//! - [`encode`]: the two-pass message encoder
//! - [`envelope`]: the 5-byte length-prefixed framing
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! let bytes = protext_core::encode("1:0::42\n2:2::\"hello\"")?;
//! assert_eq!(&bytes[..5], &[0, 0, 0, 0, 9]);
//!
//! let text = protext_core::decode(&bytes)?;
//! assert_eq!(text, "1:0::42\n2:2::\"hello\"");
//! # Ok::<(), protext_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`FieldVisitor`]: walk a decoded message in your own way
//! - [`DecoderConfig`] / [`EncoderConfig`]: depth limits and indentation
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decode;
pub mod encode;
pub mod envelope;
pub mod error;
pub mod text;

// Re-export primary types for convenience
pub use decode::{DecodedMessage, DecoderConfig, MessageDecoder, NestedDecodeResult, WireType};
pub use encode::{EncoderConfig, MessageEncoder};
pub use error::{Error, Result};
pub use text::{Field, FieldEntry, FieldValue, FieldVisitor, StatsVisitor, TypeSpecifier};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default limit on nested message depth for both directions
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Decodes an enveloped message into text with the default configuration.
pub fn decode(data: &[u8]) -> Result<String> {
    MessageDecoder::new().decode(data).map(|message| message.text)
}

/// Encodes text into an enveloped message with the default configuration.
pub fn encode(text: &str) -> Result<Vec<u8>> {
    MessageEncoder::new().encode(text)
}
