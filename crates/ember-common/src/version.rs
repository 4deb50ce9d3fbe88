//! Version types for wire compatibility.

use serde::{Deserialize, Serialize};

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

    /// Current holder snapshot format version.
    pub const HOLDER_SNAPSHOT: Self = Self::new(1, 0, 0);

    /// Current recipe file format version.
    pub const RECIPE_FILE: Self = Self::new(1, 0, 0);

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
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Magic bytes for binary payload identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicBytes(pub [u8; 4]);

impl MagicBytes {
    /// Replicated holder snapshot magic bytes.
    pub const HOLDER_SNAPSHOT: Self = Self(*b"EMSN");

    /// Returns true if `bytes` starts with these magic bytes.
    #[must_use]
    pub fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() >= 4 && bytes[..4] == self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_matches_prefix() {
        assert!(MagicBytes::HOLDER_SNAPSHOT.matches(b"EMSN\x01\x02"));
        assert!(!MagicBytes::HOLDER_SNAPSHOT.matches(b"EMS"));
        assert!(!MagicBytes::HOLDER_SNAPSHOT.matches(b"GNSV0000"));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(SchemaVersion::new(1, 2, 3).to_string(), "1.2.3");
    }

    #[test]
    fn test_version_bincode_layout_is_stable() {
        let bytes = bincode::serialize(&SchemaVersion::HOLDER_SNAPSHOT).expect("serialize");
        assert_eq!(bytes.len(), 6);
    }
}
