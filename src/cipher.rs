//! Cipher registry
//!
//! Maps human-readable cipher names to the block (or stream) cipher used
//! for datagram encryption. The set of ciphers is closed; lengths follow
//! the conventions of the OpenSSL EVP descriptors the wire format was
//! defined against, so peers using those descriptors interoperate.

use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorCategory, ErrorKind, Result, TuncryptError};

/// Upper bound on key length across all supported ciphers.
pub const MAX_KEY_SIZE: usize = 32;

/// Upper bound on block/IV length across all supported ciphers.
pub const MAX_BLOCK_SIZE: usize = 32;

/// Block size used for padding when a cipher has no IV (stream ciphers).
pub const DEFAULT_PADDING_BLOCK: usize = 16;

/// Supported datagram ciphers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKind {
    /// AES with a 128-bit key, CBC mode.
    Aes128,
    /// AES with a 256-bit key, CBC mode.
    Aes256,
    /// Single DES, CBC mode.
    Des,
    /// DES with pre/post whitening keys (DESX), CBC mode.
    Desx,
    /// RC4 stream cipher with a 128-bit key.
    Rc4,
}

/// Static description of a cipher's key and block geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherDescriptor {
    pub kind: CipherKind,
    /// Key length in bytes.
    pub key_length: usize,
    /// Native block length in bytes (1 for stream ciphers).
    pub block_length: usize,
    /// Native IV length in bytes (0 when the cipher takes no IV).
    pub iv_length: usize,
}

impl CipherDescriptor {
    /// Block size datagrams are zero-padded to.
    pub const fn padding_block(&self) -> usize {
        if self.iv_length == 0 {
            DEFAULT_PADDING_BLOCK
        } else {
            self.iv_length
        }
    }
}

impl CipherKind {
    /// Every supported cipher, in registry order.
    pub const ALL: [CipherKind; 5] = [
        CipherKind::Aes128,
        CipherKind::Aes256,
        CipherKind::Des,
        CipherKind::Desx,
        CipherKind::Rc4,
    ];

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            CipherKind::Aes128 => "aes-128",
            CipherKind::Aes256 => "aes-256",
            CipherKind::Des => "des",
            CipherKind::Desx => "desx",
            CipherKind::Rc4 => "rc4",
        }
    }

    pub const fn descriptor(self) -> CipherDescriptor {
        let (key_length, block_length, iv_length) = match self {
            CipherKind::Aes128 => (16, 16, 16),
            CipherKind::Aes256 => (32, 16, 16),
            CipherKind::Des => (8, 8, 8),
            CipherKind::Desx => (24, 8, 8),
            CipherKind::Rc4 => (16, 1, 0),
        };
        CipherDescriptor {
            kind: self,
            key_length,
            block_length,
            iv_length,
        }
    }
}

// Buffers downstream are sized against MAX_KEY_SIZE/MAX_BLOCK_SIZE; a
// descriptor outside those bounds must not build.
const _: () = {
    let mut i = 0;
    while i < CipherKind::ALL.len() {
        let d = CipherKind::ALL[i].descriptor();
        assert!(d.key_length <= MAX_KEY_SIZE);
        assert!(d.iv_length <= MAX_BLOCK_SIZE);
        assert!(d.padding_block() <= MAX_BLOCK_SIZE);
        i += 1;
    }
};

/// Resolve a cipher by name, ignoring ASCII case.
///
/// Returns `None` for names outside the registry.
pub fn resolve(name: &str) -> Option<CipherKind> {
    let kind = CipherKind::ALL
        .into_iter()
        .find(|kind| kind.name().eq_ignore_ascii_case(name));
    match kind {
        Some(kind) => tracing::debug!(cipher = kind.name(), "resolved cipher"),
        None => tracing::debug!(name, "cipher name not in registry"),
    }
    kind
}

/// Like [`resolve`], but reports an unknown name as a configuration error.
pub fn lookup(name: &str) -> Result<CipherKind> {
    resolve(name).ok_or_else(|| {
        TuncryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::UnknownCipher,
            format!(
                "unsupported cipher '{}' (expected one of: {})",
                name,
                supported_names().join(", ")
            ),
        )
    })
}

/// Names of all supported ciphers.
pub fn supported_names() -> Vec<&'static str> {
    CipherKind::ALL.iter().map(|kind| kind.name()).collect()
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherKind {
    type Err = TuncryptError;

    fn from_str(s: &str) -> Result<Self> {
        lookup(s)
    }
}
