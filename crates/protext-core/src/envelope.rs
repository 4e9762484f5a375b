//! The 5-byte message envelope.
//!
//! ```text
//! byte 0:      compression flag (always 0x00)
//! bytes 1..4:  payload length, unsigned 32-bit big-endian
//! bytes 5..:   payload
//! ```

use crate::error::{Error, Result};
use bytes::BufMut;

/// Width of the envelope header in bytes
pub const HEADER_LEN: usize = 5;

/// Compression flag for an uncompressed payload
pub const UNCOMPRESSED: u8 = 0;

/// Writes the envelope header for a payload of `payload_len` bytes.
pub fn write_header<B: BufMut>(buf: &mut B, payload_len: usize) -> Result<()> {
    let len = u32::try_from(payload_len).map_err(|_| Error::MessageTooLarge { size: payload_len })?;
    buf.put_u8(UNCOMPRESSED);
    buf.put_u32(len);
    Ok(())
}

/// Validates the envelope and returns the payload it wraps.
pub fn split_envelope(data: &[u8]) -> Result<&[u8]> {
    if data.len() < HEADER_LEN {
        return Err(Error::invalid_envelope(format!(
            "need {} header bytes, have {}",
            HEADER_LEN,
            data.len()
        )));
    }

    let (header, payload) = data.split_at(HEADER_LEN);
    if header[0] != UNCOMPRESSED {
        return Err(Error::CompressedMessage { flag: header[0] });
    }

    let declared = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if usize::try_from(declared).ok() != Some(payload.len()) {
        return Err(Error::invalid_envelope(format!(
            "length field says {} bytes, payload has {}",
            declared,
            payload.len()
        )));
    }

    Ok(payload)
}
