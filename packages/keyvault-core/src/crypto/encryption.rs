//! # Encryption Module
//!
//! AES-256-GCM sealing of private key material.
//!
//! ## Blob Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ENCRYPTED BLOB                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   0            12                              len-16            len    │
//! │   ├────────────┼────────────────────────────────┼────────────────┤     │
//! │   │   nonce    │          ciphertext            │   auth tag     │     │
//! │   │ (12 bytes) │   (same length as plaintext)   │   (16 bytes)   │     │
//! │   └────────────┴────────────────────────────────┴────────────────┘     │
//! │                                                                         │
//! │  • nonce: fresh random value for every encryption                      │
//! │  • tag: covers the whole ciphertext plus the associated data           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Modes
//!
//! | Condition | Error |
//! |-----------|-------|
//! | Random source fails | `RngFailed` |
//! | Cipher cannot be built | `EncryptionFailed` |
//! | Blob shorter than a nonce | `MalformedBlob` |
//! | Tag mismatch (wrong key, tampering, truncation) | `AuthenticationFailed` |

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::{CryptoRng, RngCore};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce (number used once) for AES-GCM encryption
///
/// **NEVER reuse a nonce with the same key!** Every call to [`encrypt`]
/// draws a new one from the supplied random source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a random nonce
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        rng.try_fill_bytes(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A 256-bit AES-GCM key derived from a passphrase
///
/// Lives only for the duration of one encrypt or decrypt call and is
/// zeroized when dropped.
#[derive(ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Encrypt `plaintext` and return `nonce || ciphertext || tag`
///
/// `aad` is authenticated but not encrypted; pass an empty slice for the
/// legacy file format.
pub fn encrypt<R: RngCore + CryptoRng>(
    key: &SymmetricKey,
    plaintext: &[u8],
    aad: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let cipher = key.cipher()?;
    let nonce = Nonce::random(rng)?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    let ciphertext = cipher
        .encrypt(AesNonce::from_slice(nonce.as_bytes()), payload)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(nonce.as_bytes());
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`]
///
/// Never returns unauthenticated plaintext: any tag mismatch is reported
/// as [`Error::AuthenticationFailed`].
pub fn decrypt(key: &SymmetricKey, blob: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if blob.len() < NONCE_SIZE {
        return Err(Error::MalformedBlob(format!(
            "expected at least {} bytes, got {}",
            NONCE_SIZE,
            blob.len()
        )));
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    let cipher = key.cipher()?;

    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(AesNonce::from_slice(nonce), payload)
        .map(Zeroizing::new)
        .map_err(|_| Error::AuthenticationFailed)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    /// A random source that always fails, standing in for a broken OS RNG
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {}
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    impl CryptoRng for BrokenRng {}

    fn key(byte: u8) -> SymmetricKey {
        SymmetricKey::from_bytes([byte; KEY_SIZE])
    }

    #[test]
    fn test_encrypt_decrypt_basic() {
        let plaintext = b"Hello, World!";

        let blob = encrypt(&key(42), plaintext, b"", &mut OsRng).unwrap();
        let decrypted = decrypt(&key(42), &blob, b"").unwrap();

        assert_eq!(decrypted.as_slice(), plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let blob = encrypt(&key(42), b"", b"", &mut OsRng).unwrap();
        assert_eq!(blob.len(), NONCE_SIZE + TAG_SIZE);

        let decrypted = decrypt(&key(42), &blob, b"").unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_blob_layout() {
        let plaintext = [7u8; 64];
        let blob = encrypt(&key(1), &plaintext, b"", &mut OsRng).unwrap();

        assert_eq!(blob.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = encrypt(&key(1), b"secret", b"", &mut OsRng).unwrap();
        let result = decrypt(&key(2), &blob, b"");

        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_wrong_aad_fails() {
        let blob = encrypt(&key(1), b"secret", b"header", &mut OsRng).unwrap();
        let result = decrypt(&key(1), &blob, b"other header");

        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let blob = encrypt(&key(9), b"0123456789abcdef", b"", &mut OsRng).unwrap();

        for byte in 0..blob.len() {
            for bit in 0..8 {
                let mut tampered = blob.clone();
                tampered[byte] ^= 1 << bit;
                assert!(
                    matches!(decrypt(&key(9), &tampered, b""), Err(Error::AuthenticationFailed)),
                    "flip of bit {} in byte {} went unnoticed",
                    bit,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_short_blob_is_malformed() {
        for len in 0..NONCE_SIZE {
            let result = decrypt(&key(1), &vec![0u8; len], b"");
            assert!(matches!(result, Err(Error::MalformedBlob(_))));
        }
    }

    #[test]
    fn test_truncated_blob_fails_authentication() {
        let blob = encrypt(&key(1), b"secret", b"", &mut OsRng).unwrap();

        // Nonce intact but tag missing
        let result = decrypt(&key(1), &blob[..NONCE_SIZE + 4], b"");
        assert!(matches!(result, Err(Error::AuthenticationFailed)));

        let result = decrypt(&key(1), &blob[..blob.len() - 1], b"");
        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_different_nonces_produce_different_blobs() {
        let blob1 = encrypt(&key(3), b"same", b"", &mut OsRng).unwrap();
        let blob2 = encrypt(&key(3), b"same", b"", &mut OsRng).unwrap();

        assert_ne!(blob1[..NONCE_SIZE], blob2[..NONCE_SIZE]);
        assert_ne!(blob1, blob2);
    }

    #[test]
    fn test_broken_rng_is_an_environment_failure() {
        let result = encrypt(&key(3), b"data", b"", &mut BrokenRng);

        let err = result.unwrap_err();
        assert!(matches!(err, Error::RngFailed(_)));
        assert!(!err.is_recoverable());
    }
}
