//! # Cryptography Module
//!
//! All cryptographic primitives used by the key vault.
//!
//! ## Key Protection Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PROTECTING A PRIVATE KEY                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  KeyScheme::generate()  ──►  (private key, public key)                 │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                       private_key_to_hex()  (64 hex chars)             │
//! │                                   │                                     │
//! │  passphrase ──► kdf ──► 32-byte   │                                     │
//! │                         key ──────┤                                     │
//! │                                   ▼                                     │
//! │                    AES-256-GCM (random 96-bit nonce)                   │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                     nonce || ciphertext || tag                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Notes |
//! |-----------|---------|-------|
//! | BLS12-381 (min_pk) | Consensus signing | via `blst` |
//! | AES-256-GCM | Key file encryption | AEAD, 128-bit tag |
//! | Argon2id | Passphrase hashing | salted, memory-hard |
//! | MD5-hex | Legacy passphrase hashing | unsalted, read/write compatibility only |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: symmetric keys and hex-encoded secrets are zeroized when dropped
//! 2. **Secure Random**: every random draw goes through an injected `RngCore + CryptoRng`
//! 3. **No Nonce Reuse**: a fresh nonce for every encryption

mod encryption;
mod kdf;
mod keys;

pub use encryption::{decrypt, encrypt, Nonce, SymmetricKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use kdf::{
    argon2id_key, generate_salt, legacy_passphrase_key, Argon2Params, KeyDerivation,
    ARGON2_ITERATIONS, ARGON2_MEMORY_KIB, ARGON2_PARALLELISM, MAX_ARGON2_ITERATIONS,
    MAX_ARGON2_MEMORY_KIB, MAX_ARGON2_PARALLELISM, SALT_SIZE,
};
pub use keys::{
    Bls12381, BlsPrivateKey, BlsPublicKey, KeyScheme, BLS_PRIVATE_KEY_SIZE, BLS_PUBLIC_KEY_SIZE,
    DST_CONSENSUS,
};
