//! tuncrypt - passphrase-keyed datagram encryption for point-to-point tunnels
//!
//! A cipher is resolved once by name ([`cipher`]), a key is derived once
//! from the shared passphrase ([`kdf`]), and every datagram is then padded
//! and encrypted or decrypted in place ([`datagram`]). [`frame`] adds the
//! length field needed to strip padding on receipt.
//!
//! There is no authentication and the IV is fixed, so this protects
//! confidentiality of distinct payloads only against passive observers.

#![forbid(unsafe_code)]

pub mod cipher;
pub mod datagram;
pub mod error;
pub mod file_ops;
pub mod frame;
pub mod kdf;
pub mod passphrase;
pub mod varmor;

pub use cipher::{CipherDescriptor, CipherKind, resolve};
pub use datagram::DatagramCipher;
pub use error::{ErrorCategory, ErrorKind, Result, TuncryptError};
pub use kdf::{KeyMaterial, derive_key};
