// ============================================
// File: crates/meshwire-core/src/protocol/version.rs
// ============================================
//! # Protocol Versioning
//!
//! ## Creation Reason
//! The server handshake carries the protocol version in the header's
//! `operation_data` field; both peers must agree on it exactly.
//!
//! ## Version History
//! | Version | Description |
//! |---------|-------------|
//! | 1       | Initial wire format (80-byte header) |
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALWAYS increment the version for wire format changes
//! - Version 0 is reserved: a server handshake with zero
//!   `operation_data` is structurally invalid
//!
//! ## Last Modified
//! v0.1.0 - Initial version definitions

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================
// Constants
// ============================================

/// Current protocol version, carried in server handshakes.
pub const PROTOCOL_VERSION: u64 = 1;

// ============================================
// ProtocolVersion
// ============================================

/// Protocol version identifier.
///
/// # Example
/// ```
/// use meshwire_core::protocol::ProtocolVersion;
///
/// let version = ProtocolVersion::current();
/// assert!(version.is_compatible_with(&ProtocolVersion::new(1)));
/// assert!(!ProtocolVersion::new(0).is_compatible_with(&version));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(u64);

impl ProtocolVersion {
    /// Creates a protocol version from its raw value.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the version this build speaks.
    #[must_use]
    pub const fn current() -> Self {
        Self(PROTOCOL_VERSION)
    }

    /// Returns the raw version number.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Versions are compatible only if identical.
    #[must_use]
    pub const fn is_compatible_with(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u64> for ProtocolVersion {
    fn from(version: u64) -> Self {
        Self(version)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_version() {
        let version = ProtocolVersion::current();
        assert_eq!(version.as_u64(), PROTOCOL_VERSION);
        assert_ne!(version.as_u64(), 0);
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = ProtocolVersion::new(1);
        let v2 = ProtocolVersion::new(2);

        assert!(v1.is_compatible_with(&ProtocolVersion::from(1)));
        assert!(!v1.is_compatible_with(&v2));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(ProtocolVersion::new(3).to_string(), "v3");
    }
}
