//! # Key File Format
//!
//! Two on-disk layouts are understood.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LEGACY                                                                 │
//! │                                                                         │
//! │  nonce (12) │ ciphertext │ tag (16)                                    │
//! │                                                                         │
//! │  key = legacy_passphrase_key(passphrase), no associated data           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  SALTED v1                                                              │
//! │                                                                         │
//! │  "BLSK" │ 0x01 │ m u32 │ t u32 │ p u32 │ salt (16) │ nonce (12) │ ...   │
//! │  └──────────────── header, 33 bytes, used as AAD ─────────────┘        │
//! │                                                                         │
//! │  key = Argon2id(passphrase, salt, m, t, p)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Integers are big-endian. A blob is read as salted only when it starts
//! with the magic and version and carries valid Argon2 parameters;
//! everything else is read as legacy.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::naming::KeyFileName;
use crate::crypto::{self, Argon2Params, KeyDerivation, SymmetricKey, SALT_SIZE};
use crate::error::{Error, Result};

/// Magic bytes opening a salted key file
pub const MAGIC: &[u8; 4] = b"BLSK";

/// Current salted format version
pub const FORMAT_VERSION: u8 = 1;

/// Length of the salted header
pub const HEADER_SIZE: usize = MAGIC.len() + 1 + 3 * 4 + SALT_SIZE;

/// Which layout new key files are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyFileFormat {
    /// Unsalted legacy layout, readable by older tooling
    Legacy,
    /// Salted v1 layout with Argon2id
    Argon2id(Argon2Params),
}

impl Default for KeyFileFormat {
    fn default() -> Self {
        KeyFileFormat::Argon2id(Argon2Params::default())
    }
}

impl KeyFileFormat {
    /// Pick the derivation for a new file, drawing a salt if needed
    pub fn new_derivation<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<KeyDerivation> {
        match self {
            KeyFileFormat::Legacy => Ok(KeyDerivation::Legacy),
            KeyFileFormat::Argon2id(params) => KeyDerivation::argon2id(*params, rng),
        }
    }
}

/// Serialize the header for a derivation (empty for legacy)
pub fn encode_header(derivation: &KeyDerivation) -> Vec<u8> {
    match derivation {
        KeyDerivation::Legacy => Vec::new(),
        KeyDerivation::Argon2id { params, salt } => {
            let mut header = Vec::with_capacity(HEADER_SIZE);
            header.extend_from_slice(MAGIC);
            header.push(FORMAT_VERSION);
            header.extend_from_slice(&params.memory_kib.to_be_bytes());
            header.extend_from_slice(&params.iterations.to_be_bytes());
            header.extend_from_slice(&params.parallelism.to_be_bytes());
            header.extend_from_slice(salt);
            header
        }
    }
}

/// Split a stored blob into its derivation, header and encrypted body
pub fn decode_header(blob: &[u8]) -> (KeyDerivation, &[u8], &[u8]) {
    match parse_salted_header(blob) {
        Some(derivation) => {
            let (header, body) = blob.split_at(HEADER_SIZE);
            (derivation, header, body)
        }
        None => (KeyDerivation::Legacy, &blob[..0], blob),
    }
}

fn parse_salted_header(blob: &[u8]) -> Option<KeyDerivation> {
    if blob.len() < HEADER_SIZE || &blob[..4] != MAGIC || blob[4] != FORMAT_VERSION {
        return None;
    }

    let word = |at: usize| u32::from_be_bytes([blob[at], blob[at + 1], blob[at + 2], blob[at + 3]]);
    let params = Argon2Params {
        memory_kib: word(5),
        iterations: word(9),
        parallelism: word(13),
    };
    if let Err(e) = params.validate() {
        tracing::debug!("Key file has salted magic but unusable parameters ({}); reading as legacy", e);
        return None;
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&blob[17..HEADER_SIZE]);
    Some(KeyDerivation::Argon2id { params, salt })
}

/// Encrypt `plaintext` into a complete key file blob
pub fn seal<R: RngCore + CryptoRng>(
    derivation: &KeyDerivation,
    key: &SymmetricKey,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let mut blob = encode_header(derivation);
    let body = crypto::encrypt(key, plaintext, &blob, rng)?;
    blob.extend_from_slice(&body);
    Ok(blob)
}

/// Decrypt a complete key file blob with `passphrase`
pub fn open(blob: &[u8], passphrase: &str) -> Result<Zeroizing<Vec<u8>>> {
    let (derivation, header, body) = decode_header(blob);
    tracing::debug!(
        salted = !header.is_empty(),
        size = blob.len(),
        "Decrypting key file"
    );

    let key = derivation.derive(passphrase)?;
    crypto::decrypt(&key, body, header)
}

// ============================================================================
// FILE SYSTEM
// ============================================================================

/// Create the key directory with owner-only permissions if it is missing
///
/// Every directory created on the way gets mode 0700; existing parents are
/// left alone.
pub fn ensure_key_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    // A file in the way reports AlreadyExists, which is not a key collision
    builder.create(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::AlreadyExists => {
            Error::StorageWriteError(format!("{} exists and is not a directory", dir.display()))
        }
        _ => Error::write_failure(e, dir),
    })?;

    // The umask may have masked the mode
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
            .map_err(|e| Error::write_failure(e, dir))?;
    }

    tracing::debug!(dir = %dir.display(), "Created key directory");
    Ok(())
}

/// Write a key file atomically with owner-only permissions
///
/// The blob goes to a temporary file in `dir` first and is then renamed
/// into place, so a crash never leaves a half-written key behind. An
/// existing file with the same name is never overwritten.
pub fn write_key_file(dir: &Path, name: &KeyFileName, blob: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name.as_str());
    let temp_dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };

    // tempfile creates the file with mode 0600 on Unix
    let mut file = tempfile::NamedTempFile::new_in(temp_dir).map_err(|e| Error::write_failure(e, &path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::write_failure(e, &path))?;
    }

    file.write_all(blob).map_err(|e| Error::write_failure(e, &path))?;
    file.as_file().sync_all().map_err(|e| Error::write_failure(e, &path))?;

    file.persist_noclobber(&path)
        .map_err(|e| Error::write_failure(e.error, &path))?;

    Ok(path)
}

/// Read the full content of a key file
pub fn read_key_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::read_failure(e, path))
}

/// List the key files in `dir`, oldest first
///
/// Entries whose names are not key file names are skipped.
pub fn list_key_files(dir: &Path) -> Result<Vec<KeyFileName>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::read_failure(e, dir))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::read_failure(e, dir))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Ok(name) = KeyFileName::parse(&file_name) {
            names.push(name);
        }
    }

    names.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.as_str().cmp(b.as_str()))
    });
    Ok(names)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::legacy_passphrase_key;
    use crate::storage::naming::build_file_name;
    use crate::time::FixedClock;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cheap_format() -> KeyFileFormat {
        KeyFileFormat::Argon2id(Argon2Params {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
    }

    fn sealed(format: KeyFileFormat, passphrase: &str, plaintext: &[u8]) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(11);
        let derivation = format.new_derivation(&mut rng).unwrap();
        let key = derivation.derive(passphrase).unwrap();
        seal(&derivation, &key, plaintext, &mut rng).unwrap()
    }

    #[test]
    fn test_legacy_blob_has_no_header() {
        let blob = sealed(KeyFileFormat::Legacy, "pw", b"abcd");
        assert_eq!(blob.len(), crypto::NONCE_SIZE + 4 + crypto::TAG_SIZE);

        // Readable with nothing but the legacy cipher
        let plain = crypto::decrypt(&legacy_passphrase_key("pw"), &blob, b"").unwrap();
        assert_eq!(plain.as_slice(), b"abcd");
    }

    #[test]
    fn test_salted_header_layout() {
        let blob = sealed(cheap_format(), "pw", b"abcd");

        assert_eq!(&blob[..4], MAGIC);
        assert_eq!(blob[4], FORMAT_VERSION);
        assert_eq!(&blob[5..9], &64u32.to_be_bytes());
        assert_eq!(&blob[9..13], &1u32.to_be_bytes());
        assert_eq!(&blob[13..17], &1u32.to_be_bytes());
        assert_eq!(blob.len(), HEADER_SIZE + crypto::NONCE_SIZE + 4 + crypto::TAG_SIZE);
    }

    #[test]
    fn test_open_both_formats() {
        for format in [KeyFileFormat::Legacy, cheap_format()] {
            let blob = sealed(format, "correct-horse", b"key material");
            let plain = open(&blob, "correct-horse").unwrap();
            assert_eq!(plain.as_slice(), b"key material");

            let wrong = open(&blob, "wrong-password");
            assert!(matches!(wrong, Err(Error::AuthenticationFailed)));
        }
    }

    #[test]
    fn test_header_tampering_detected() {
        let blob = sealed(cheap_format(), "pw", b"abcd");

        // Flip a salt bit: different key, and the header is AAD anyway
        let mut tampered = blob.clone();
        tampered[20] ^= 0x01;
        assert!(matches!(open(&tampered, "pw"), Err(Error::AuthenticationFailed)));

        // Bump iterations to another valid value
        let mut tampered = blob;
        tampered[12] = 2;
        assert!(matches!(open(&tampered, "pw"), Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_invalid_params_fall_back_to_legacy() {
        let mut blob = encode_header(&KeyDerivation::Argon2id {
            params: Argon2Params {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
            salt: [0; SALT_SIZE],
        });
        // parallelism = 0 is never written by us
        blob[13..17].copy_from_slice(&0u32.to_be_bytes());

        let (derivation, header, body) = decode_header(&blob);
        assert_eq!(derivation, KeyDerivation::Legacy);
        assert!(header.is_empty());
        assert_eq!(body.len(), HEADER_SIZE);
    }

    #[test]
    fn test_oversized_costs_fall_back_to_legacy() {
        let header = encode_header(&KeyDerivation::Argon2id {
            params: Argon2Params {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
            salt: [0; SALT_SIZE],
        });

        // Top bit of memory, then of iterations
        for byte in [5, 9] {
            let mut blob = header.clone();
            blob[byte] ^= 0x80;
            let (derivation, header, _) = decode_header(&blob);
            assert_eq!(derivation, KeyDerivation::Legacy, "byte {}", byte);
            assert!(header.is_empty());
        }
    }

    #[test]
    fn test_short_blob_is_malformed() {
        let result = open(&[1, 2, 3], "pw");
        assert!(matches!(result, Err(Error::MalformedBlob(_))));
    }

    #[test]
    fn test_format_config_serialization() {
        let json = serde_json::to_string(&KeyFileFormat::Legacy).unwrap();
        assert_eq!(json, r#"{"kind":"legacy"}"#);

        let parsed: KeyFileFormat = serde_json::from_str(
            r#"{"kind":"argon2id","memory_kib":1024,"iterations":2,"parallelism":1}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            KeyFileFormat::Argon2id(Argon2Params {
                memory_kib: 1024,
                iterations: 2,
                parallelism: 1,
            })
        );
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let name = build_file_name("abcd", &FixedClock(Utc::now()));

        let path = write_key_file(dir.path(), &name, b"blob bytes").unwrap();
        assert_eq!(path, dir.path().join(name.as_str()));
        assert_eq!(read_key_file(&path).unwrap(), b"blob bytes");
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let name = build_file_name("abcd", &FixedClock(Utc::now()));
        let path = write_key_file(dir.path(), &name, b"secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_write_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let name = build_file_name("abcd", &FixedClock(Utc::now()));

        write_key_file(dir.path(), &name, b"first").unwrap();
        let second = write_key_file(dir.path(), &name, b"second");

        assert!(matches!(second, Err(Error::KeyFileExists(_))));
        assert_eq!(read_key_file(&dir.path().join(name.as_str())).unwrap(), b"first");
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_key_file(&dir.path().join("UTC--missing"));

        assert!(matches!(result, Err(Error::KeyFileNotFound(_))));
    }

    #[test]
    fn test_ensure_key_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("keys");

        ensure_key_dir(&nested).unwrap();
        assert!(nested.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode(&nested), 0o700);
            // Intermediate directories are not world-readable either
            assert_eq!(mode(&dir.path().join("a")) & 0o077, 0);
        }
    }

    #[test]
    fn test_list_key_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let older = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let newer_name = build_file_name("bb", &FixedClock(newer));
        let older_name = build_file_name("aa", &FixedClock(older));
        write_key_file(dir.path(), &newer_name, b"x").unwrap();
        write_key_file(dir.path(), &older_name, b"y").unwrap();
        fs::write(dir.path().join("README"), b"not a key").unwrap();
        fs::create_dir(dir.path().join("UTC--2024-01-01T00-00-00.000000000Z--bls_cc")).unwrap();

        let listed = list_key_files(dir.path()).unwrap();
        assert_eq!(listed, vec![older_name, newer_name]);
    }
}
