//! # Key Management
//!
//! The vault does not care which curve its keys live on. It needs a
//! [`KeyScheme`]: something that can create a key pair and move each half
//! to and from a fixed-width hex string.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      BLS12-381 (min_pk)                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Private key: scalar, 32 bytes  → 64 hex characters                    │
//! │  Public key:  G1 point, 48 bytes compressed → 96 hex characters        │
//! │                                                                         │
//! │  generate:  32 random bytes of IKM → KeyGen (IETF BLS draft)           │
//! │  public:    sk · G1                                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use blst::min_pk::{PublicKey as BlstPublicKey, SecretKey as BlstSecretKey, Signature};
use blst::BLST_ERROR;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};

/// Size of a BLS private key in bytes
pub const BLS_PRIVATE_KEY_SIZE: usize = 32;

/// Size of a compressed BLS public key in bytes
pub const BLS_PUBLIC_KEY_SIZE: usize = 48;

/// Domain separation tag for consensus signatures
pub const DST_CONSENSUS: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Key-pair capability used by the vault
///
/// Implementations must round-trip losslessly:
/// `private_key_from_hex(private_key_to_hex(k)) == k`.
pub trait KeyScheme: Send + Sync {
    /// The secret half of a key pair
    type PrivateKey;
    /// The public half of a key pair
    type PublicKey;

    /// Create a fresh key pair
    fn generate<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Self::PrivateKey, Self::PublicKey)>;

    /// Derive the public key of a private key
    fn public_key(&self, private_key: &Self::PrivateKey) -> Self::PublicKey;

    /// Serialize a private key to its fixed-width hex form
    fn private_key_to_hex(&self, private_key: &Self::PrivateKey) -> Zeroizing<String>;

    /// Parse a private key from its hex form
    ///
    /// Fails with [`Error::MalformedKey`] for anything that is not a valid
    /// encoding.
    fn private_key_from_hex(&self, hex: &str) -> Result<Self::PrivateKey>;

    /// Serialize a public key to its fixed-width hex form
    fn public_key_to_hex(&self, public_key: &Self::PublicKey) -> String;
}

/// BLS12-381 private key
#[derive(Clone)]
pub struct BlsPrivateKey(BlstSecretKey);

impl BlsPrivateKey {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Zeroizing<[u8; BLS_PRIVATE_KEY_SIZE]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> BlsPublicKey {
        BlsPublicKey(self.0.sk_to_pk())
    }

    /// Sign a message with domain separation
    pub fn sign(&self, msg: &[u8], dst: &[u8]) -> Signature {
        self.0.sign(msg, dst, &[])
    }
}

impl PartialEq for BlsPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        *self.to_bytes() == *other.to_bytes()
    }
}

impl Eq for BlsPrivateKey {}

impl std::fmt::Debug for BlsPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlsPrivateKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// BLS12-381 public key (48 bytes compressed)
#[derive(Clone, PartialEq, Eq)]
pub struct BlsPublicKey(BlstPublicKey);

impl BlsPublicKey {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; BLS_PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Serialize to hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify a signature made with [`BlsPrivateKey::sign`]
    pub fn verify(&self, msg: &[u8], dst: &[u8], sig: &Signature) -> bool {
        sig.verify(true, msg, dst, &[], &self.0, true) == BLST_ERROR::BLST_SUCCESS
    }
}

impl std::fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "BlsPublicKey({})", hex::encode(&bytes[..8]))
    }
}

/// The BLS12-381 key scheme backed by `blst`
#[derive(Debug, Clone, Copy, Default)]
pub struct Bls12381;

impl KeyScheme for Bls12381 {
    type PrivateKey = BlsPrivateKey;
    type PublicKey = BlsPublicKey;

    fn generate<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<(BlsPrivateKey, BlsPublicKey)> {
        let mut ikm = [0u8; 32];
        rng.try_fill_bytes(&mut ikm)?;

        let secret = BlstSecretKey::key_gen(&ikm, &[]);
        ikm.zeroize();

        let private_key = BlsPrivateKey(
            secret.map_err(|e| Error::KeyGenerationFailed(format!("{:?}", e)))?,
        );
        let public_key = private_key.public_key();
        Ok((private_key, public_key))
    }

    fn public_key(&self, private_key: &BlsPrivateKey) -> BlsPublicKey {
        private_key.public_key()
    }

    fn private_key_to_hex(&self, private_key: &BlsPrivateKey) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(*private_key.to_bytes()))
    }

    fn private_key_from_hex(&self, hex_str: &str) -> Result<BlsPrivateKey> {
        if hex_str.len() != BLS_PRIVATE_KEY_SIZE * 2 {
            return Err(Error::MalformedKey(format!(
                "expected {} hex characters, got {}",
                BLS_PRIVATE_KEY_SIZE * 2,
                hex_str.len()
            )));
        }

        let mut bytes = Zeroizing::new([0u8; BLS_PRIVATE_KEY_SIZE]);
        hex::decode_to_slice(hex_str, &mut bytes[..])
            .map_err(|e| Error::MalformedKey(format!("invalid hex: {}", e)))?;

        BlstSecretKey::from_bytes(&bytes[..])
            .map(BlsPrivateKey)
            .map_err(|e| Error::MalformedKey(format!("not a valid scalar: {:?}", e)))
    }

    fn public_key_to_hex(&self, public_key: &BlsPublicKey) -> String {
        public_key.to_hex()
    }
}

// ============================================================================
// TESTS
// ============================================================================
