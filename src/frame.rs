//! Length-framed datagrams
//!
//! The transform engine pads to the block size and cannot tell padding
//! from payload on the way back. A sealed record therefore carries the
//! payload length inside the encrypted body:
//!
//! - length: 4 bytes (big-endian u32)
//! - payload: variable length
//! - zero padding up to the cipher's block size
//!
//! The length check on open catches most wrong-passphrase and corruption
//! cases, but it is not authentication.

use std::mem::size_of;

use crate::datagram::DatagramCipher;
use crate::error::{ErrorCategory, ErrorKind, Result, TuncryptError};

/// Size of the length header in bytes.
pub const HEADER_LEN: usize = size_of::<u32>();

/// Frame and encrypt `payload` into a single datagram.
pub fn seal(cipher: &DatagramCipher, payload: &[u8]) -> Result<Vec<u8>> {
    let payload_len = u32::try_from(payload.len()).map_err(|_| {
        TuncryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::BinaryFormat,
            format!("payload of {} bytes is too large to frame", payload.len()),
        )
    })?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + cipher.block_size());
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(payload);
    cipher.encrypt(&mut buf)?;

    tracing::debug!(
        cipher = %cipher.kind(),
        payload_len,
        datagram_len = buf.len(),
        "sealed datagram"
    );
    Ok(buf)
}

/// Decrypt a datagram produced by [`seal`] and return the original payload.
pub fn open(cipher: &DatagramCipher, datagram: &[u8]) -> Result<Vec<u8>> {
    if datagram.len() < HEADER_LEN {
        return Err(TuncryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::TruncatedInput,
            "input likely truncated while reading length header",
        ));
    }

    let mut buf = datagram.to_vec();
    cipher.decrypt(&mut buf)?;

    let (header, body) = buf.split_at(HEADER_LEN);
    let mut length_bytes = [0u8; HEADER_LEN];
    length_bytes.copy_from_slice(header);
    let payload_len = u32::from_be_bytes(length_bytes) as usize;

    if payload_len > body.len() {
        return Err(TuncryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::BinaryFormat,
            "corrupt input or bad passphrase; claimed length greater than available data",
        ));
    }
    if body.len() - payload_len >= cipher.block_size() {
        return Err(TuncryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::BinaryFormat,
            "corrupt input or bad passphrase; padding longer than one block",
        ));
    }

    tracing::debug!(cipher = %cipher.kind(), payload_len, "opened datagram");
    Ok(body[..payload_len].to_vec())
}
