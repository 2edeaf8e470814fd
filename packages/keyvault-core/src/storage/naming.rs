//! # Key File Naming
//!
//! Every key file is named after the moment it was created and the public
//! key it protects:
//!
//! ```text
//! UTC--2024-03-01T12-30-45.123456789Z--bls_8f3a…(96 hex chars)
//! └─┬─┘└──────────────┬───────────────┘└─┬─┘└──────┬──────────┘
//!  prefix   timestamp (ns, ':' → '-')  marker  public key hex
//! ```
//!
//! Colons are replaced with dashes so the name is a valid path component
//! on every common file system. Two distinct key pairs never share a
//! public key, so names cannot collide even within one nanosecond.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Offset, TimeZone};

use crate::error::{Error, Result};
use crate::time::Clock;

/// Leading marker of every key file name
pub const FILE_NAME_PREFIX: &str = "UTC--";

/// Separator between the timestamp and the public key
pub const PUBLIC_KEY_MARKER: &str = "--bls_";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.9f";

/// Name of a persisted key file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyFileName {
    name: String,
    created_at: DateTime<FixedOffset>,
    public_key_start: usize,
}

impl KeyFileName {
    /// Parse and validate a key file name
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || Error::InvalidFileName(name.to_string());

        let rest = name.strip_prefix(FILE_NAME_PREFIX).ok_or_else(invalid)?;
        let (timestamp, public_key_hex) = rest.split_once(PUBLIC_KEY_MARKER).ok_or_else(invalid)?;

        let is_lower_hex = |b: u8| b.is_ascii_digit() || (b'a'..=b'f').contains(&b);
        if public_key_hex.is_empty() || !public_key_hex.bytes().all(is_lower_hex) {
            return Err(invalid());
        }

        let created_at = parse_timestamp(timestamp).ok_or_else(invalid)?;

        Ok(Self {
            name: name.to_string(),
            created_at,
            public_key_start: name.len() - public_key_hex.len(),
        })
    }

    /// The full file name
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Creation time recorded in the name
    pub fn created_at(&self) -> DateTime<FixedOffset> {
        self.created_at
    }

    /// Hex encoding of the public key recorded in the name
    pub fn public_key_hex(&self) -> &str {
        &self.name[self.public_key_start..]
    }
}

impl fmt::Display for KeyFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for KeyFileName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl AsRef<std::path::Path> for KeyFileName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.name)
    }
}

impl FromStr for KeyFileName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Build the file name for a key created now
pub fn build_file_name<C: Clock + ?Sized>(public_key_hex: &str, clock: &C) -> KeyFileName {
    let now = clock.now();
    let name = format!(
        "{}{}{}{}",
        FILE_NAME_PREFIX,
        format_timestamp(&now),
        PUBLIC_KEY_MARKER,
        public_key_hex
    );

    KeyFileName {
        public_key_start: name.len() - public_key_hex.len(),
        created_at: now.fixed_offset(),
        name,
    }
}

/// Format a timestamp as path-safe ISO 8601 with nanoseconds
///
/// UTC is written as `Z`; any other zone as a `+HHMM` / `-HHMM` offset.
pub fn format_timestamp<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let base = t.format(TIMESTAMP_FORMAT);
    if t.offset().fix().local_minus_utc() == 0 {
        format!("{}Z", base)
    } else {
        format!("{}{}", base, t.format("%z"))
    }
}

/// Inverse of [`format_timestamp`], accepting only its canonical output
fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = match s.strip_suffix('Z') {
        Some(base) => format!("{}+0000", base),
        None => s.to_string(),
    };

    let parsed = DateTime::parse_from_str(&normalized, &format!("{}%z", TIMESTAMP_FORMAT)).ok()?;
    (format_timestamp(&parsed) == s).then_some(parsed)
}

// ============================================================================
// TESTS
// ============================================================================
