//! Error types for the protext-core library.
//!
//! Every failure is fatal to the decode or encode call that produced it.
//! The speculative nested paths consult [`Error::is_recoverable`] to decide
//! whether a failure may be turned into a string/bytes fallback instead.

use thiserror::Error;

/// Result type alias for protext operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all protext operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Truncated or otherwise malformed protobuf wire data
    #[error("invalid wire format at offset {offset}: {details}")]
    InvalidWireFormat {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Varint ran past the end of the buffer or exceeded ten bytes
    #[error("invalid wire format: truncated or overlong varint at offset {offset}")]
    VarintDecode {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// Wire type outside of {0, 1, 2, 5}
    #[error("invalid wire type: {wire_type}")]
    InvalidWireType {
        /// The rejected wire type value
        wire_type: u64,
    },

    /// Field number of zero or above the protobuf maximum
    #[error("invalid field number {number}: must be between 1 and {max}")]
    InvalidFieldNumber {
        /// The invalid field number
        number: u64,
        /// Maximum valid field number
        max: u32,
    },

    /// Malformed 5-byte message envelope
    #[error("invalid message envelope: {details}")]
    InvalidEnvelope {
        /// What was wrong with the envelope
        details: String,
    },

    /// Envelope announces a compressed payload
    #[error("compressed messages are not supported (flag {flag})")]
    CompressedMessage {
        /// The compression flag byte
        flag: u8,
    },

    /// Nested block braces do not balance
    #[error("invalid format: extra or missing curly braces")]
    UnbalancedBraces,

    /// Entry lacks the `:` or `::` separator
    #[error("invalid format: missing field number or wire type in '{entry}'")]
    MissingFieldNumberOrWireType {
        /// The offending entry text
        entry: String,
    },

    /// Entry is structurally present but its parts do not parse
    #[error("invalid format in '{entry}': {details}")]
    InvalidFormat {
        /// The offending entry or value text
        entry: String,
        /// What failed to parse
        details: String,
    },

    /// Default length-delimited value without an enclosing pair of quotes
    #[error("string must be enclosed by double quotes: {value}")]
    UnquotedString {
        /// The unquoted value
        value: String,
    },

    /// Value of a `B` entry is not valid hex
    #[error("invalid hex string: {details}")]
    InvalidHex {
        /// What was wrong with the hex text
        details: String,
    },

    /// Nested messages deeper than the configured maximum
    #[error("nesting depth exceeds the maximum of {max}")]
    RecursionLimit {
        /// The configured maximum depth
        max: usize,
    },

    /// Payload does not fit the 32-bit envelope length
    #[error("message of {size} bytes exceeds the envelope limit")]
    MessageTooLarge {
        /// The payload size in bytes
        size: usize,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new wire format error
    pub fn invalid_wire_format(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidWireFormat {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new varint decode error
    pub fn varint_decode(offset: usize) -> Self {
        Self::VarintDecode { offset }
    }

    /// Creates a new envelope error
    pub fn invalid_envelope(details: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            details: details.into(),
        }
    }

    /// Creates a new missing-separator error
    pub fn missing_separator(entry: impl Into<String>) -> Self {
        Self::MissingFieldNumberOrWireType {
            entry: entry.into(),
        }
    }

    /// Creates a new invalid format error
    pub fn invalid_format(entry: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidFormat {
            entry: entry.into(),
            details: details.into(),
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if a speculative nested decode or encode may absorb this
    /// error and fall back to treating the value as a string or bytes.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::RecursionLimit { .. } | Self::MessageTooLarge { .. } | Self::Internal(_)
        )
    }

    /// Returns true if the error comes from reading wire bytes, as opposed
    /// to parsing text.
    pub fn is_wire_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidWireFormat { .. }
                | Self::VarintDecode { .. }
                | Self::InvalidWireType { .. }
                | Self::InvalidFieldNumber { .. }
                | Self::InvalidEnvelope { .. }
                | Self::CompressedMessage { .. }
        )
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        let details = match err {
            hex::FromHexError::OddLength => "odd length".to_string(),
            hex::FromHexError::InvalidHexCharacter { c, index } => {
                format!("invalid character '{}' at index {}", c, index)
            }
            hex::FromHexError::InvalidStringLength => "invalid length".to_string(),
        };
        Self::InvalidHex { details }
    }
}
