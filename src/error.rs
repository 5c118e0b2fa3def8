use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Invariant violations (a key that does not fit its cipher, a cipher
    /// that refuses initialisation) always land here.
    Internal,

    /// The user supplied configuration or input that cannot be used, such
    /// as an unknown cipher name or a file that is not tuncrypt data.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The cipher name does not match any supported algorithm.
    UnknownCipher,
    /// The armored representation is malformed (prefix, fields, or encoding).
    ArmoringInvalid,
    /// Base64 decoding of the armored payload failed.
    ArmoringDecode,
    /// Input claimed to be tuncrypt data but used a future/unsupported version.
    ArmoringFromFuture,
    /// A decrypted record carries a length field that does not fit its body.
    BinaryFormat,
    /// Input data ended before the expected component could be read.
    TruncatedInput,
    /// Cipher selection given on the command line disagrees with the input.
    CipherMismatch,
    /// Passphrase could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// Key material and cipher disagree, or the cipher refused to initialise.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct TuncryptError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Any code consuming errors MUST
    /// handle the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl TuncryptError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Shorthand for an `Internal`/`InternalInvariant` error.
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::Internal, ErrorKind::InternalInvariant, msg)
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// True when the error signals a broken invariant rather than bad input.
    ///
    /// Callers must not emit any output produced alongside such an error.
    pub fn is_invariant_violation(&self) -> bool {
        self.kind == Some(ErrorKind::InternalInvariant)
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    ///
    /// Category and kind are carried over so callers can still branch on them.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TuncryptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_kind_and_chain() {
        let err = TuncryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::UnknownCipher,
            "unsupported cipher 'blowfish'",
        )
        .with_context("failed to set up datagram cipher");

        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.kind, Some(ErrorKind::UnknownCipher));
        assert_eq!(err.to_string(), "failed to set up datagram cipher");
        let source = err.source().expect("expected wrapped source");
        assert_eq!(source.to_string(), "unsupported cipher 'blowfish'");
    }

    #[test]
    fn test_invariant_helper() {
        let err = TuncryptError::invariant("key length 7 does not match des");
        assert!(err.is_invariant_violation());
        assert_eq!(err.category, ErrorCategory::Internal);
        assert!(!TuncryptError::new(ErrorCategory::User, "x").is_invariant_violation());
    }
}
