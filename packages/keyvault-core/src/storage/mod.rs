//! # Storage Module
//!
//! Key files on disk: what they are called and what is inside them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           KEY DIRECTORY                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  <key_dir>/            mode 0700                                       │
//! │    UTC--<ts>--bls_<public key hex>      mode 0600, one key per file    │
//! │    UTC--<ts>--bls_<public key hex>                                     │
//! │                                                                         │
//! │  naming    → file name ⇄ (timestamp, public key)                       │
//! │  key_file  → blob layout, atomic writes, directory listing             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Files are written once and never modified or overwritten.

pub mod key_file;
pub mod naming;

pub use key_file::{
    ensure_key_dir, list_key_files, read_key_file, write_key_file, KeyFileFormat, FORMAT_VERSION,
    HEADER_SIZE, MAGIC,
};
pub use naming::{build_file_name, format_timestamp, KeyFileName, FILE_NAME_PREFIX, PUBLIC_KEY_MARKER};
