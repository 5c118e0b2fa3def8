//! Datagram transform engine
//!
//! Pads a datagram with zero bytes to the cipher's block size and encrypts
//! or decrypts it in place. Block ciphers run in CBC mode with library
//! padding disabled; RC4 applies its keystream from a fresh state.
//!
//! Every call uses the same IV ([`IV_SEED`] truncated to the block size)
//! and there is no authentication tag: identical plaintext prefixes
//! produce identical ciphertext prefixes, and tampered ciphertext decrypts
//! to garbage without any error. Peers that speak this format depend on
//! both properties, so they are kept as-is.
//!
//! Decryption does not remove padding. The original length has to travel
//! separately (see [`crate::frame`]).

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use rc4::consts::U16;
use rc4::{Rc4, StreamCipher};
use zeroize::Zeroizing;

use crate::cipher::{CipherKind, MAX_BLOCK_SIZE};
use crate::error::{Result, TuncryptError};
use crate::kdf::KeyMaterial;

/// Seed for the fixed IV. Each call uses its first `padding_block()` bytes.
pub const IV_SEED: [u8; MAX_BLOCK_SIZE] = [
    0xab, 0xcd, 0xef, 0x12, 0x34, 0x56, 0x78, 0x90, //
    0xab, 0xcd, 0xef, 0x12, 0x34, 0x56, 0x78, 0x90, //
    0xab, 0xcd, 0xef, 0x12, 0x34, 0x56, 0x78, 0x90, //
    0xab, 0xcd, 0xef, 0x12, 0x34, 0x56, 0x78, 0x90,
];

/// DES block size, which DESX shares.
const DES_BLOCK: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Zero-pad `buf` up to the next multiple of `block` and return the new length.
///
/// Already-aligned buffers (including empty ones) are left untouched.
pub fn pad_to_block(buf: &mut Vec<u8>, block: usize) -> usize {
    let rem = buf.len() % block;
    if rem != 0 {
        buf.resize(buf.len() + (block - rem), 0);
    }
    buf.len()
}

/// Pad and encrypt `buf` in place, returning the ciphertext length.
///
/// On error the buffer contents are unspecified and must not be sent.
pub fn encrypt(key: &KeyMaterial, kind: CipherKind, buf: &mut Vec<u8>) -> Result<usize> {
    transform(key, kind, buf, Direction::Encrypt)
}

/// Pad and decrypt `buf` in place, returning the decrypted length.
///
/// The result still carries the zero padding added by the sender.
pub fn decrypt(key: &KeyMaterial, kind: CipherKind, buf: &mut Vec<u8>) -> Result<usize> {
    transform(key, kind, buf, Direction::Decrypt)
}

fn transform(
    key: &KeyMaterial,
    kind: CipherKind,
    buf: &mut Vec<u8>,
    direction: Direction,
) -> Result<usize> {
    let desc = kind.descriptor();
    if key.len() != desc.key_length {
        return Err(TuncryptError::invariant(format!(
            "{}-byte key supplied for {}, which requires {} bytes",
            key.len(),
            kind,
            desc.key_length
        )));
    }

    let block = desc.padding_block();
    let iv = &IV_SEED[..block];
    let len = pad_to_block(buf, block);
    let key = key.as_bytes();

    match (kind, direction) {
        (CipherKind::Aes128, Direction::Encrypt) => cbc_encrypt::<aes::Aes128>(key, iv, buf)?,
        (CipherKind::Aes128, Direction::Decrypt) => cbc_decrypt::<aes::Aes128>(key, iv, buf)?,
        (CipherKind::Aes256, Direction::Encrypt) => cbc_encrypt::<aes::Aes256>(key, iv, buf)?,
        (CipherKind::Aes256, Direction::Decrypt) => cbc_decrypt::<aes::Aes256>(key, iv, buf)?,
        (CipherKind::Des, Direction::Encrypt) => cbc_encrypt::<des::Des>(key, iv, buf)?,
        (CipherKind::Des, Direction::Decrypt) => cbc_decrypt::<des::Des>(key, iv, buf)?,
        (CipherKind::Desx, direction) => desx_cbc(key, iv, buf, direction)?,
        (CipherKind::Rc4, _) => {
            let mut rc4 = Rc4::<U16>::new_from_slice(key).map_err(|_| init_failed(kind))?;
            rc4.apply_keystream(buf);
        }
    }

    tracing::trace!(cipher = %kind, ?direction, len, "transformed datagram");
    Ok(len)
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let len = buf.len();
    cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| {
            TuncryptError::invariant(format!("failed to initialise CBC encryptor: {}", e))
        })?
        .encrypt_padded_mut::<NoPadding>(buf, len)
        .map_err(|_| TuncryptError::invariant("CBC input is not block aligned"))?;
    Ok(())
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| {
            TuncryptError::invariant(format!("failed to initialise CBC decryptor: {}", e))
        })?
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| TuncryptError::invariant("CBC input is not block aligned"))?;
    Ok(())
}

/// DESX-CBC expressed through DES-CBC.
///
/// DESX computes `C[i] = K2 ^ DES(P[i] ^ K1 ^ C[i-1])`. Substituting
/// `D[i] = C[i] ^ K2` gives `D[i] = DES(P[i] ^ K1 ^ K2 ^ D[i-1])` with
/// `D[0] = IV ^ K2`, which is plain DES-CBC over whitened blocks.
fn desx_cbc(key: &[u8], iv: &[u8], buf: &mut [u8], direction: Direction) -> Result<()> {
    let (des_key, whitening) = key.split_at(DES_BLOCK);
    let (k1, k2) = whitening.split_at(DES_BLOCK);

    let mut k1k2 = Zeroizing::new([0u8; DES_BLOCK]);
    let mut shifted_iv = Zeroizing::new([0u8; DES_BLOCK]);
    for i in 0..DES_BLOCK {
        k1k2[i] = k1[i] ^ k2[i];
        shifted_iv[i] = iv[i] ^ k2[i];
    }

    match direction {
        Direction::Encrypt => {
            xor_blocks(buf, &*k1k2);
            cbc_encrypt::<des::Des>(des_key, &*shifted_iv, buf)?;
            xor_blocks(buf, k2);
        }
        Direction::Decrypt => {
            xor_blocks(buf, k2);
            cbc_decrypt::<des::Des>(des_key, &*shifted_iv, buf)?;
            xor_blocks(buf, &*k1k2);
        }
    }
    Ok(())
}

fn xor_blocks(buf: &mut [u8], mask: &[u8]) {
    for block in buf.chunks_mut(mask.len()) {
        for (b, m) in block.iter_mut().zip(mask) {
            *b ^= m;
        }
    }
}

fn init_failed(kind: CipherKind) -> TuncryptError {
    TuncryptError::invariant(format!("failed to initialise {} cipher", kind))
}

/// Per-connection cipher state: a resolved cipher and the key derived for it.
///
/// Holds no mutable state, so one instance can serve concurrent callers.
#[derive(Debug)]
pub struct DatagramCipher {
    kind: CipherKind,
    key: KeyMaterial,
}

impl DatagramCipher {
    pub fn new(kind: CipherKind, passphrase: &str) -> Self {
        Self {
            kind,
            key: KeyMaterial::for_cipher(passphrase, kind),
        }
    }

    /// Resolve `name` and derive a key for it.
    ///
    /// An unknown name fails here, before any key is derived.
    pub fn from_name(name: &str, passphrase: &str) -> Result<Self> {
        let kind = crate::cipher::lookup(name)?;
        Ok(Self::new(kind, passphrase))
    }

    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    /// Padding granularity of this cipher; ciphertext lengths are multiples of it.
    pub fn block_size(&self) -> usize {
        self.kind.descriptor().padding_block()
    }

    pub fn encrypt(&self, buf: &mut Vec<u8>) -> Result<usize> {
        encrypt(&self.key, self.kind, buf)
    }

    pub fn decrypt(&self, buf: &mut Vec<u8>) -> Result<usize> {
        decrypt(&self.key, self.kind, buf)
    }
}
