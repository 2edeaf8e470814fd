//! # Error Handling
//!
//! Error types for the key vault.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Environment Errors (abort-worthy)                                 │
//! │  │   ├── EncryptionFailed      - Cipher could not be constructed       │
//! │  │   ├── RngFailed             - Random source unavailable             │
//! │  │   ├── KeyGenerationFailed   - Key-pair backend refused              │
//! │  │   └── KeyDerivationFailed   - Passphrase hashing failed             │
//! │  │                                                                      │
//! │  ├── Authentication Errors                                             │
//! │  │   └── AuthenticationFailed  - Wrong passphrase or tampered file     │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── KeyFileNotFound       - No such key file                      │
//! │  │   ├── PermissionDenied      - OS refused access                     │
//! │  │   ├── StorageReadError      - Other read failure                    │
//! │  │   ├── StorageWriteError     - Other write failure                   │
//! │  │   └── KeyFileExists         - Refusing to overwrite a key file      │
//! │  │                                                                      │
//! │  └── Malformed Input Errors                                            │
//! │      ├── MalformedKey          - Decrypted bytes are not a key         │
//! │      ├── MalformedBlob         - Blob shorter than a nonce             │
//! │      ├── InvalidKdfParams      - Argon2 parameters out of range        │
//! │      └── InvalidFileName       - Not a key file name                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Environment errors mean the runtime itself is broken. They are still
//! returned as values; the top-level caller decides whether to exit.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Result type alias for key vault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the key vault
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Environment Errors (100-199)
    // ========================================================================

    /// The cipher could not be constructed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// The system random source failed
    #[error("Random number generation failed: {0}")]
    RngFailed(String),

    /// The key-pair backend could not produce a key
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Passphrase hashing failed
    #[error("Failed to derive key from passphrase: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Authentication Errors (200-299)
    // ========================================================================

    /// Authentication tag mismatch on decryption
    #[error("Authentication failed: wrong passphrase or corrupted key file")]
    AuthenticationFailed,

    // ========================================================================
    // Storage Errors (300-399)
    // ========================================================================

    /// The key file does not exist
    #[error("Key file not found: {0}")]
    KeyFileNotFound(String),

    /// The OS denied access to the key file or directory
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Failed to read a key file
    #[error("Failed to read key file: {0}")]
    StorageReadError(String),

    /// Failed to write a key file
    #[error("Failed to write key file: {0}")]
    StorageWriteError(String),

    /// A key file with the same name already exists
    #[error("Key file already exists: {0}")]
    KeyFileExists(String),

    // ========================================================================
    // Malformed Input Errors (400-499)
    // ========================================================================

    /// Decrypted content is not a valid private key encoding
    #[error("Malformed private key: {0}")]
    MalformedKey(String),

    /// Encrypted blob is structurally invalid
    #[error("Malformed key file: {0}")]
    MalformedBlob(String),

    /// Argon2 parameters are out of range
    #[error("Invalid key derivation parameters: {0}")]
    InvalidKdfParams(String),

    /// String is not a key file name
    #[error("Invalid key file name: {0}")]
    InvalidFileName(String),
}

/// Coarse classification of an [`Error`]
///
/// Lets callers pick a diagnostic without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Broken runtime environment (cipher, RNG, backend)
    Environment,
    /// Wrong passphrase or tampered ciphertext
    Authentication,
    /// File system failure
    Io,
    /// Structurally invalid input
    Malformed,
}

impl Error {
    /// Get the stable numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Environment
    /// - 200-299: Authentication
    /// - 300-399: Storage
    /// - 400-499: Malformed input
    pub fn code(&self) -> i32 {
        match self {
            // Environment (100-199)
            Error::EncryptionFailed(_) => 100,
            Error::RngFailed(_) => 101,
            Error::KeyGenerationFailed(_) => 102,
            Error::KeyDerivationFailed(_) => 103,

            // Authentication (200-299)
            Error::AuthenticationFailed => 200,

            // Storage (300-399)
            Error::KeyFileNotFound(_) => 300,
            Error::PermissionDenied(_) => 301,
            Error::StorageReadError(_) => 302,
            Error::StorageWriteError(_) => 303,
            Error::KeyFileExists(_) => 304,

            // Malformed (400-499)
            Error::MalformedKey(_) => 400,
            Error::MalformedBlob(_) => 401,
            Error::InvalidKdfParams(_) => 402,
            Error::InvalidFileName(_) => 403,
        }
    }

    /// Get the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self.code() / 100 {
            1 => ErrorKind::Environment,
            2 => ErrorKind::Authentication,
            3 => ErrorKind::Io,
            _ => ErrorKind::Malformed,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Everything except an environment failure can be resolved by the
    /// caller (another passphrase, another file, fixed permissions).
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Environment
    }

    /// Classify an I/O error that occurred while reading `path`
    pub(crate) fn read_failure(err: io::Error, path: &Path) -> Self {
        let path = path.display();
        match err.kind() {
            io::ErrorKind::NotFound => Error::KeyFileNotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(format!("{}: {}", path, err)),
            _ => Error::StorageReadError(format!("{}: {}", path, err)),
        }
    }

    /// Classify an I/O error that occurred while writing `path`
    pub(crate) fn write_failure(err: io::Error, path: &Path) -> Self {
        let path = path.display();
        match err.kind() {
            io::ErrorKind::AlreadyExists => Error::KeyFileExists(path.to_string()),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(format!("{}: {}", path, err)),
            _ => Error::StorageWriteError(format!("{}: {}", path, err)),
        }
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rand::Error> for Error {
    fn from(err: rand::Error) -> Self {
        Error::RngFailed(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
