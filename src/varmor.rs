//! Versioned armoring for sealed datagrams
//!
//! Provides base64url encoding with a version and cipher prefix so a sealed
//! datagram can be stored or pasted as text. The armored format is:
//!
//! `tuncrypt1:<cipher-name>:<base64url-no-padding>`
//!
//! - Free of whitespace (including newlines)
//! - Safe to embed in URLs
//! - Safe to pass unescaped in a POSIX shell

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::cipher::{self, CipherKind};
use crate::error::{ErrorCategory, ErrorKind, Result, TuncryptError};

/// Magic prefix for all tuncrypt armor versions
const MAGIC_PREFIX: &str = "tuncrypt";

/// Version 1 magic marker
const V1_MAGIC: &str = "tuncrypt1:";

/// Armor a sealed datagram produced with `kind`.
pub fn wrap(kind: CipherKind, body: &[u8]) -> String {
    format!("{}{}:{}", V1_MAGIC, kind, URL_SAFE_NO_PAD.encode(body))
}

/// Parse armored text back into the cipher it names and the sealed bytes.
///
/// Surrounding whitespace (such as a trailing newline added by an editor)
/// is ignored.
pub fn unwrap(armored: &str) -> Result<(CipherKind, Vec<u8>)> {
    let armored = armored.trim();

    let Some(rest) = armored.strip_prefix(V1_MAGIC) else {
        return Err(if armored.starts_with(MAGIC_PREFIX) {
            TuncryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::ArmoringFromFuture,
                "input claims to be tuncrypt, but not a version we support",
            )
        } else {
            TuncryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::ArmoringInvalid,
                "input unrecognized as tuncrypt data",
            )
        });
    };

    let (name, encoded) = rest.split_once(':').ok_or_else(|| {
        TuncryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "armored input is missing its cipher field",
        )
    })?;
    let kind = cipher::lookup(name).map_err(|e| {
        e.with_context(format!("armored input names unsupported cipher '{}'", name))
    })?;

    let body = URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
        TuncryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArmoringDecode,
            format!("base64 decoding failed: {}", e),
            e,
        )
    })?;
    Ok((kind, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_output() {
        let armored = wrap(CipherKind::Desx, &[0xfb, 0xff, 0x00]);
        assert_eq!(armored, "tuncrypt1:desx:-_8A");
    }

    #[test]
    fn test_wrap_unwrap() {
        let bytes: Vec<u8> = (0..=255).collect();
        let armored = wrap(CipherKind::Aes256, &bytes);
        assert!(armored.starts_with("tuncrypt1:aes-256:"));
        assert_eq!(unwrap(&armored).unwrap(), (CipherKind::Aes256, bytes));
    }

    #[test]
    fn test_trailing_newline_tolerated() {
        let armored = format!("{}\n", wrap(CipherKind::Rc4, b"abc"));
        assert_eq!(unwrap(&armored).unwrap(), (CipherKind::Rc4, b"abc".to_vec()));
    }

    #[test]
    fn test_cipher_name_case_insensitive() {
        let (kind, _) = unwrap("tuncrypt1:AES-128:AAAA").unwrap();
        assert_eq!(kind, CipherKind::Aes128);
    }

    #[test]
    fn test_empty_input() {
        let err = unwrap("").expect_err("expected invalid armor");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringInvalid));
    }

    #[test]
    fn test_wrong_version() {
        let err = unwrap("tuncrypt2:aes-128:AAAA").expect_err("expected unsupported version");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringFromFuture));
    }

    #[test]
    fn test_not_tuncrypt() {
        let err = unwrap("openssl-enc:AAAA").expect_err("expected non-tuncrypt error");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringInvalid));
    }

    #[test]
    fn test_missing_cipher_field() {
        let err = unwrap("tuncrypt1:AAAA").expect_err("expected missing field");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringInvalid));
    }

    #[test]
    fn test_unknown_cipher() {
        let err = unwrap("tuncrypt1:blowfish:AAAA").expect_err("expected unknown cipher");
        assert_eq!(err.kind, Some(ErrorKind::UnknownCipher));
    }

    #[test]
    fn test_bad_base64() {
        let err = unwrap("tuncrypt1:des:bad$$").expect_err("expected base64 decode error");
        assert_eq!(err.kind, Some(ErrorKind::ArmoringDecode));
    }

    #[test]
    fn test_url_safe() {
        let armored = wrap(CipherKind::Aes128, &[0xFFu8; 100]);
        let encoded = armored.rsplit(':').next().unwrap();

        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));
        assert!(!armored.contains(char::is_whitespace));
    }
}
