//! # Passphrase Key Derivation
//!
//! Turns a passphrase into the 32-byte AES-256-GCM key that protects a
//! private key file.
//!
//! ## Derivation Modes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PASSPHRASE → SYMMETRIC KEY                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  LEGACY (unsalted)                                              │   │
//! │  │                                                                 │   │
//! │  │  key = ascii( lowercase_hex( MD5(passphrase) ) )               │   │
//! │  │                                                                 │   │
//! │  │  → 32 hex characters, used verbatim as an AES-256 key          │   │
//! │  │  → same passphrase, same key, for every file                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  ARGON2ID (salted, default for new files)                       │   │
//! │  │                                                                 │   │
//! │  │  key = Argon2id(                                                │   │
//! │  │    password = passphrase,                                      │   │
//! │  │    salt     = 16 random bytes (stored in the file header),     │   │
//! │  │    m, t, p  = memory_kib, iterations, parallelism             │   │
//! │  │  )                                                            │   │
//! │  │                                                                 │   │
//! │  │  → 32 bytes, unique per key file                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The legacy mode exists only to read and write files compatible with
//! the older key generator. One leaked legacy key decrypts every file
//! protected by the same passphrase.

use argon2::{Algorithm, Argon2, Params, Version};
use md5::{Digest, Md5};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::encryption::{SymmetricKey, KEY_SIZE};
use crate::error::{Error, Result};

/// Argon2id memory cost in KiB (64 MB)
pub const ARGON2_MEMORY_KIB: u32 = 65536;

/// Argon2id iteration count
pub const ARGON2_ITERATIONS: u32 = 3;

/// Argon2id parallelism (lanes)
pub const ARGON2_PARALLELISM: u32 = 4;

/// Upper bound on the memory cost accepted from a key file (1 GiB)
pub const MAX_ARGON2_MEMORY_KIB: u32 = 1024 * 1024;

/// Upper bound on the iteration count accepted from a key file
pub const MAX_ARGON2_ITERATIONS: u32 = 16;

/// Upper bound on parallelism accepted from a key file
pub const MAX_ARGON2_PARALLELISM: u32 = 16;

/// Salt length for Argon2id derivation (16 bytes)
pub const SALT_SIZE: usize = 16;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes over memory
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: ARGON2_MEMORY_KIB,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }
}

impl Argon2Params {
    /// Validate the parameters
    ///
    /// Key files carry their own parameters, so anything read from disk
    /// passes through here before Argon2 allocates memory for it.
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 || self.parallelism > MAX_ARGON2_PARALLELISM {
            return Err(Error::InvalidKdfParams(format!(
                "parallelism must be between 1 and {}, got {}",
                MAX_ARGON2_PARALLELISM, self.parallelism
            )));
        }
        if self.iterations == 0 || self.iterations > MAX_ARGON2_ITERATIONS {
            return Err(Error::InvalidKdfParams(format!(
                "iterations must be between 1 and {}, got {}",
                MAX_ARGON2_ITERATIONS, self.iterations
            )));
        }
        if self.memory_kib < 8 * self.parallelism {
            return Err(Error::InvalidKdfParams(format!(
                "memory must be at least {} KiB for parallelism {}",
                8 * self.parallelism,
                self.parallelism
            )));
        }
        if self.memory_kib > MAX_ARGON2_MEMORY_KIB {
            return Err(Error::InvalidKdfParams(format!(
                "memory must be at most {} KiB, got {}",
                MAX_ARGON2_MEMORY_KIB, self.memory_kib
            )));
        }
        Ok(())
    }
}

/// How a passphrase becomes a [`SymmetricKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDerivation {
    /// Unsalted MD5-hex derivation used by legacy key files
    Legacy,
    /// Salted Argon2id derivation
    Argon2id {
        /// Cost parameters
        params: Argon2Params,
        /// Per-file random salt
        salt: [u8; SALT_SIZE],
    },
}

impl KeyDerivation {
    /// Create an Argon2id derivation with a fresh random salt
    pub fn argon2id<R: RngCore + CryptoRng>(params: Argon2Params, rng: &mut R) -> Result<Self> {
        params.validate()?;
        Ok(KeyDerivation::Argon2id {
            params,
            salt: generate_salt(rng)?,
        })
    }

    /// Derive the symmetric key for `passphrase`
    pub fn derive(&self, passphrase: &str) -> Result<SymmetricKey> {
        match self {
            KeyDerivation::Legacy => Ok(legacy_passphrase_key(passphrase)),
            KeyDerivation::Argon2id { params, salt } => argon2id_key(passphrase, salt, params),
        }
    }
}

/// Derive the legacy, unsalted key from a passphrase
///
/// Deterministic and infallible: every string, including the empty one,
/// maps to exactly one key.
pub fn legacy_passphrase_key(passphrase: &str) -> SymmetricKey {
    let digest = Md5::digest(passphrase.as_bytes());

    // 16 digest bytes always fill exactly 32 hex characters
    let encoded = Zeroizing::new(hex::encode(digest));
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(encoded.as_bytes());
    SymmetricKey::from_bytes(*key)
}

/// Derive a key from a passphrase and salt using Argon2id
pub fn argon2id_key(passphrase: &str, salt: &[u8], params: &Argon2Params) -> Result<SymmetricKey> {
    params.validate()?;

    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| Error::InvalidKdfParams(format!("Invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| Error::KeyDerivationFailed(format!("Argon2id failed: {e}")))?;

    Ok(SymmetricKey::from_bytes(*key))
}

/// Generate a random salt
pub fn generate_salt<R: RngCore + CryptoRng>(rng: &mut R) -> Result<[u8; SALT_SIZE]> {
    let mut salt = [0u8; SALT_SIZE];
    rng.try_fill_bytes(&mut salt)?;
    Ok(salt)
}

// ============================================================================
// TESTS
// ============================================================================
