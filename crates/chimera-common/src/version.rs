//! Version types for schema compatibility.

use serde::{Deserialize, Serialize};

use crate::error::{ChimeraError, ChimeraResult};

/// Schema version using semantic versioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u16,
    /// Minor version (backwards-compatible additions)
    pub minor: u16,
    /// Patch version (bug fixes)
    pub patch: u16,
}

impl SchemaVersion {
    /// Creates a new schema version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Current simulation snapshot version.
    pub const SNAPSHOT: Self = Self::new(1, 0, 0);

    /// Current bestiary (agent blueprint) version.
    pub const BESTIARY: Self = Self::new(1, 0, 0);

    /// Current event bus protocol version.
    pub const EVENT_BUS: Self = Self::new(1, 0, 0);

    /// Checks if this version is compatible with another version.
    /// Compatible means same major version and this minor >= other minor.
    #[must_use]
    pub const fn is_compatible_with(&self, other: &Self) -> bool {
        self.major == other.major && self.minor >= other.minor
    }

    /// Checks if this version can read data from another version.
    #[must_use]
    pub const fn can_read(&self, data_version: &Self) -> bool {
        self.major == data_version.major
    }

    /// Fails with [`ChimeraError::VersionMismatch`] unless `data_version` is readable.
    pub fn ensure_can_read(&self, data_version: Self) -> ChimeraResult<()> {
        if self.can_read(&data_version) {
            Ok(())
        } else {
            Err(ChimeraError::VersionMismatch {
                expected: *self,
                actual: data_version,
            })
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Magic bytes for binary format identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicBytes(pub [u8; 4]);

impl MagicBytes {
    /// Chimera simulation snapshot magic bytes.
    pub const SNAPSHOT: Self = Self(*b"CHSN");

    /// Splits `bytes` into its header magic and the remaining payload,
    /// failing if the header does not match `self`.
    pub fn strip<'a>(&self, bytes: &'a [u8]) -> ChimeraResult<&'a [u8]> {
        if bytes.len() < 4 {
            return Err(ChimeraError::Serialization(format!(
                "payload too short for magic header: {} bytes",
                bytes.len()
            )));
        }
        let (head, rest) = bytes.split_at(4);
        let mut actual = [0u8; 4];
        actual.copy_from_slice(head);
        if actual == self.0 {
            Ok(rest)
        } else {
            Err(ChimeraError::BadMagic {
                expected: self.0,
                actual,
            })
        }
    }
}
