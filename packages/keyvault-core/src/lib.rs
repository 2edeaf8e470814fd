//! # Keyvault Core
//!
//! Passphrase-protected, file-based storage for BLS12-381 signing keys.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KEYVAULT CORE MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │  Vault                                                            │ │
//! │  │  - generate_and_store(passphrase) → (private key, file name)     │ │
//! │  │  - load_from_file(file name, passphrase) → private key           │ │
//! │  └───────────┬───────────────────────────────┬───────────────────────┘ │
//! │              │                               │                         │
//! │  ┌───────────▼───────────┐       ┌───────────▼───────────┐             │
//! │  │   Crypto              │       │   Storage             │             │
//! │  │                       │       │                       │             │
//! │  │ - KeyScheme (BLS)     │       │ - File naming         │             │
//! │  │ - Passphrase hashing  │       │ - Key file format     │             │
//! │  │ - AES-256-GCM         │       │ - Atomic writes       │             │
//! │  └───────────────────────┘       └───────────────────────┘             │
//! │                                                                         │
//! │  Time (injectable clock)          Error (codes, kinds)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Key pairs, passphrase hashing, authenticated encryption
//! - [`storage`] - Key file names, on-disk layout, file system access
//! - [`time`] - Clock abstraction
//! - [`vault`] - Generate and load operations
//!
//! ## Example
//!
//! ```no_run
//! use keyvault_core::{Bls12381, KeyVault, VaultConfig};
//!
//! # fn main() -> keyvault_core::Result<()> {
//! let vault = KeyVault::new(Bls12381, VaultConfig::default());
//!
//! let (private_key, file_name) = vault.generate_and_store("correct-horse")?;
//! let loaded = vault.load_from_file(&file_name, "correct-horse")?;
//! assert_eq!(loaded, private_key);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod storage;
pub mod time;
pub mod vault;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{Argon2Params, Bls12381, BlsPrivateKey, BlsPublicKey, KeyScheme};
pub use error::{Error, ErrorKind, Result};
pub use storage::{KeyFileFormat, KeyFileName};
pub use time::{Clock, FixedClock, SystemClock};
pub use vault::{generate_and_store, load_from_file, KeyVault, VaultConfig};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Keyvault Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
