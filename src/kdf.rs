//! Passphrase to key expansion
//!
//! Both ends of a tunnel derive the same key independently from a shared
//! passphrase: the MD5 digest of the passphrase is the 16-byte seed, and
//! the key is that seed truncated (short keys) or repeated (long keys).
//! There is no salt and no work factor.

use std::fmt;

use md5::{Digest, Md5};
use zeroize::Zeroizing;

use crate::cipher::CipherKind;

/// Length of the MD5 seed in bytes.
pub const SEED_LEN: usize = 16;

/// Cipher key derived from a passphrase. Wiped from memory on drop.
pub struct KeyMaterial {
    bytes: Zeroizing<Vec<u8>>,
}

impl KeyMaterial {
    /// Derive key material sized for `kind`.
    pub fn for_cipher(passphrase: &str, kind: CipherKind) -> Self {
        derive_key(passphrase, kind.descriptor().key_length)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Expand `passphrase` into `key_length` bytes of key material.
pub fn derive_key(passphrase: &str, key_length: usize) -> KeyMaterial {
    let mut seed = Zeroizing::new([0u8; SEED_LEN]);
    seed.copy_from_slice(&Md5::digest(passphrase.as_bytes()));

    let mut bytes = Zeroizing::new(vec![0u8; key_length]);
    for chunk in bytes.chunks_mut(SEED_LEN) {
        chunk.copy_from_slice(&seed[..chunk.len()]);
    }

    tracing::trace!(key_length, "derived key material");
    KeyMaterial { bytes }
}
