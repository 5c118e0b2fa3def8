//! File encryption/decryption operations
//!
//! Seals a whole file as one datagram and stores it armored, so the
//! datagram format can be exercised from the command line without a
//! tunnel peer.

use crate::cipher::CipherKind;
use crate::datagram::DatagramCipher;
use crate::error::{ErrorCategory, ErrorKind, Result, TuncryptError};
use crate::frame;
use crate::passphrase::PassphraseReader;
use crate::varmor;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Encrypt a file with a passphrase under `kind`.
///
/// Reads plaintext from `input_path`, seals it as one datagram using a
/// passphrase from `passphrase_reader`, and writes the armored result to
/// `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    kind: CipherKind,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let cipher = DatagramCipher::new(kind, &passphrase);
    let sealed =
        frame::seal(&cipher, &plaintext).map_err(|e| e.with_context("encryption failed"))?;
    let armored = varmor::wrap(kind, &sealed);
    write_file_secure(output_path, armored.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::info!(
        input = %input_path.display(),
        output = %output_path.display(),
        cipher = %kind,
        "encrypted file"
    );
    Ok(())
}

/// Decrypt a file with a passphrase.
///
/// The cipher is taken from the armor header. If `expected` is given and
/// names a different cipher, the file is rejected before any key is
/// derived.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    expected: Option<CipherKind>,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let armored_bytes = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let armored = String::from_utf8(armored_bytes).map_err(|e| {
        TuncryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "input file is not valid UTF-8",
            e,
        )
    })?;
    let (kind, sealed) =
        varmor::unwrap(&armored).map_err(|e| e.with_context("failed to unarmor"))?;

    if let Some(expected) = expected.filter(|expected| *expected != kind) {
        return Err(TuncryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::CipherMismatch,
            format!(
                "{} was encrypted with {}, not {}",
                input_path.display(),
                kind,
                expected
            ),
        ));
    }

    let passphrase = passphrase_reader.read_passphrase()?;
    let cipher = DatagramCipher::new(kind, &passphrase);
    let plaintext =
        frame::open(&cipher, &sealed).map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::info!(
        input = %input_path.display(),
        output = %output_path.display(),
        cipher = %kind,
        "decrypted file"
    );
    Ok(())
}

/// Atomically replace `path` with `contents` (tempfile + fsync + rename).
///
/// The file ends up with mode 0o600 on Unix. Either the old file or the
/// complete new file exists afterwards, never a partial write.
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        TuncryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| io_error("failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| io_error("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| io_error("failed to sync file prior to rename", e))?;

    // NamedTempFile already creates 0o600 files; make it explicit.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| io_error("failed to set tempfile permissions", e))?;
    }

    temp_file.persist(path).map_err(|e| {
        TuncryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn io_error(msg: &str, err: io::Error) -> TuncryptError {
    TuncryptError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> TuncryptError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    TuncryptError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passphrase::ConstantPassphraseReader;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for kind in CipherKind::ALL {
            let temp_dir = TempDir::new().unwrap();
            let plain_path = temp_dir.path().join("plain.txt");
            let crypt_path = temp_dir.path().join("crypt.txt.tun");
            let decrypted_path = temp_dir.path().join("decrypted.txt");

            let plaintext = b"Hello, tuncrypt!";
            fs::write(&plain_path, plaintext).unwrap();

            let mut reader = ConstantPassphraseReader::new("test password");
            encrypt_file(&plain_path, &crypt_path, kind, &mut reader).unwrap();
            let armored = fs::read_to_string(&crypt_path).unwrap();
            assert!(armored.starts_with(&format!("tuncrypt1:{}:", kind)));

            let mut reader = ConstantPassphraseReader::new("test password");
            decrypt_file(&crypt_path, &decrypted_path, None, &mut reader).unwrap();
            assert_eq!(fs::read(&decrypted_path).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_decrypt_with_matching_cipher() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.tun");
        let decrypted_path = temp_dir.path().join("decrypted.txt");
        fs::write(&plain_path, b"payload").unwrap();

        let mut reader = ConstantPassphraseReader::new("pw");
        encrypt_file(&plain_path, &crypt_path, CipherKind::Des, &mut reader).unwrap();
        decrypt_file(
            &crypt_path,
            &decrypted_path,
            Some(CipherKind::Des),
            &mut reader,
        )
        .unwrap();
        assert_eq!(fs::read(&decrypted_path).unwrap(), b"payload");
    }

    #[test]
    fn test_decrypt_cipher_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.tun");
        let decrypted_path = temp_dir.path().join("decrypted.txt");
        fs::write(&plain_path, b"payload").unwrap();

        let mut reader = ConstantPassphraseReader::new("pw");
        encrypt_file(&plain_path, &crypt_path, CipherKind::Aes128, &mut reader).unwrap();
        let err = decrypt_file(
            &crypt_path,
            &decrypted_path,
            Some(CipherKind::Aes256),
            &mut reader,
        )
        .expect_err("expected cipher mismatch");
        assert_eq!(err.kind, Some(ErrorKind::CipherMismatch));
        assert!(!decrypted_path.exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_file_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.tun");

        fs::write(&plain_path, b"test").unwrap();

        let mut reader = ConstantPassphraseReader::new("test");
        encrypt_file(&plain_path, &crypt_path, CipherKind::Aes128, &mut reader).unwrap();

        let permissions = fs::metadata(&crypt_path).unwrap().permissions();
        assert_eq!(permissions.mode() & 0o777, 0o600);
    }

    #[test]
    fn test_decrypt_wrong_passphrase() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.tun");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, b"secret that spans a couple of blocks").unwrap();

        let mut reader = ConstantPassphraseReader::new("correct");
        encrypt_file(&plain_path, &crypt_path, CipherKind::Aes256, &mut reader).unwrap();

        let mut reader = ConstantPassphraseReader::new("wrong");
        let err = decrypt_file(&crypt_path, &decrypted_path, None, &mut reader)
            .expect_err("expected length check to reject");
        assert_eq!(err.kind, Some(ErrorKind::BinaryFormat));
        assert!(!decrypted_path.exists());
    }

    #[test]
    fn test_missing_input_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut reader = ConstantPassphraseReader::new("test");
        let err = encrypt_file(
            &temp_dir.path().join("absent"),
            &temp_dir.path().join("out"),
            CipherKind::Rc4,
            &mut reader,
        )
        .expect_err("expected read failure");
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.kind, Some(ErrorKind::Io));
    }

    #[test]
    fn test_overwrites_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.tun");
        fs::write(&plain_path, b"new").unwrap();
        fs::write(&crypt_path, b"old contents").unwrap();

        let mut reader = ConstantPassphraseReader::new("test");
        encrypt_file(&plain_path, &crypt_path, CipherKind::Desx, &mut reader).unwrap();
        assert!(
            fs::read_to_string(&crypt_path)
                .unwrap()
                .starts_with("tuncrypt1:desx:")
        );
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("empty.txt");
        let crypt_path = temp_dir.path().join("empty.txt.tun");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, b"").unwrap();

        let mut reader = ConstantPassphraseReader::new("test");
        encrypt_file(&plain_path, &crypt_path, CipherKind::Aes128, &mut reader).unwrap();
        decrypt_file(&crypt_path, &decrypted_path, None, &mut reader).unwrap();

        assert_eq!(fs::read(&decrypted_path).unwrap(), b"");
    }
}
