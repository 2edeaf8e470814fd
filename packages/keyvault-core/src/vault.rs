//! # Key Vault
//!
//! Orchestrates the two operations callers actually use.
//!
//! ## Generate
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  generate_and_store(passphrase)                                        │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. KeyScheme::generate            → (private, public)                 │
//! │  2. build_file_name(public hex)    → UTC--<ts>--bls_<hex>              │
//! │  3. private_key_to_hex             → 64 hex chars                      │
//! │  4. kdf + AES-256-GCM              → key file blob                     │
//! │  5. atomic write, mode 0600        → <key_dir>/<file name>             │
//! │  6. return (private, file name)                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Load
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load_from_file(file name, passphrase)                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  read file ──► detect format ──► kdf ──► AES-256-GCM open ──► hex ──►  │
//! │  private key                                                           │
//! │                                                                         │
//! │  KeyFileNotFound      AuthenticationFailed         MalformedKey        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed write is an error. The private key is never handed back for a
//! key that did not make it to disk.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::{Bls12381, BlsPrivateKey, KeyScheme};
use crate::error::{Error, Result};
use crate::storage::{
    build_file_name, ensure_key_dir, key_file, list_key_files, read_key_file, write_key_file,
    KeyFileFormat, KeyFileName,
};
use crate::time::{Clock, SystemClock};

/// Vault configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Directory key files are written to and resolved against
    pub key_dir: PathBuf,
    /// Layout for newly written key files
    pub format: KeyFileFormat,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("."),
            format: KeyFileFormat::default(),
        }
    }
}

/// Generates, persists and recovers passphrase-protected private keys
///
/// The clock and random source are injected; production code uses
/// [`SystemClock`] and [`OsRng`]. The random source sits behind a mutex,
/// so one vault can serve several threads.
pub struct KeyVault<S, C = SystemClock, R = OsRng> {
    scheme: S,
    clock: C,
    rng: Mutex<R>,
    config: VaultConfig,
}

impl<S: KeyScheme> KeyVault<S> {
    /// Create a vault using the system clock and OS random source
    pub fn new(scheme: S, config: VaultConfig) -> Self {
        Self::with_sources(scheme, config, SystemClock, OsRng)
    }
}

impl<S, C, R> KeyVault<S, C, R>
where
    S: KeyScheme,
    C: Clock,
    R: RngCore + CryptoRng,
{
    /// Create a vault with explicit clock and random source
    pub fn with_sources(scheme: S, config: VaultConfig, clock: C, rng: R) -> Self {
        Self {
            scheme,
            clock,
            rng: Mutex::new(rng),
            config,
        }
    }

    /// The vault configuration
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// The key scheme
    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    /// Generate a key pair, encrypt the private key under `passphrase`
    /// and write it to a new file in the key directory
    pub fn generate_and_store(&self, passphrase: &str) -> Result<(S::PrivateKey, KeyFileName)> {
        let (private_key, public_key, derivation) = {
            let mut rng = self.rng.lock();
            let (private_key, public_key) = self.scheme.generate(&mut *rng)?;
            let derivation = self.config.format.new_derivation(&mut *rng)?;
            (private_key, public_key, derivation)
        };

        let file_name = build_file_name(&self.scheme.public_key_to_hex(&public_key), &self.clock);
        let private_key_hex = self.scheme.private_key_to_hex(&private_key);

        // Argon2 runs outside the lock
        let key = derivation.derive(passphrase)?;
        let blob = key_file::seal(&derivation, &key, private_key_hex.as_bytes(), &mut *self.rng.lock())?;

        let key_dir = &self.config.key_dir;
        let path = ensure_key_dir(key_dir)
            .and_then(|_| write_key_file(key_dir, &file_name, &blob))
            .map_err(|e| {
                tracing::warn!(file = %file_name, error = %e, "Failed to persist generated key");
                e
            })?;

        tracing::info!(
            path = %path.display(),
            public_key = file_name.public_key_hex(),
            "Generated new key"
        );
        Ok((private_key, file_name))
    }

    /// Decrypt the key stored in `file_name` with `passphrase`
    ///
    /// Relative names resolve against the key directory.
    pub fn load_from_file<P: AsRef<Path>>(&self, file_name: P, passphrase: &str) -> Result<S::PrivateKey> {
        let path = self.config.key_dir.join(file_name.as_ref());
        let blob = read_key_file(&path)?;

        let plaintext = key_file::open(&blob, passphrase).map_err(|e| {
            if matches!(e, Error::AuthenticationFailed) {
                tracing::warn!(path = %path.display(), "Key file did not authenticate");
            }
            e
        })?;

        let private_key_hex = std::str::from_utf8(&plaintext)
            .map_err(|_| Error::MalformedKey("decrypted key is not UTF-8".into()))?;
        let private_key = self.scheme.private_key_from_hex(private_key_hex)?;

        tracing::info!(path = %path.display(), "Loaded key");
        Ok(private_key)
    }

    /// List the key files in the key directory, oldest first
    pub fn list_keys(&self) -> Result<Vec<KeyFileName>> {
        list_key_files(&self.config.key_dir)
    }
}

/// Generate a BLS key protected by `passphrase` in the current directory
pub fn generate_and_store(passphrase: &str) -> Result<(BlsPrivateKey, KeyFileName)> {
    KeyVault::new(Bls12381, VaultConfig::default()).generate_and_store(passphrase)
}

/// Load a BLS key written by [`generate_and_store`]
pub fn load_from_file<P: AsRef<Path>>(file_name: P, passphrase: &str) -> Result<BlsPrivateKey> {
    KeyVault::new(Bls12381, VaultConfig::default()).load_from_file(file_name, passphrase)
}

// ============================================================================
// TESTS
// ============================================================================
