// ============================================
// File: crates/meshwire-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Identifier handling is shared by every crate; its failures are reported
//! through one type that the higher layers wrap with `#[from]`.
//!
//! ## Main Functionality
//! - `CommonError`: Malformed binary or textual identifiers
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use crate::types::NodeIdError;

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Identifier errors shared across meshwire crates.
///
/// # Example
/// ```
/// use meshwire_common::error::CommonError;
/// use meshwire_common::types::NodeId;
///
/// let err = NodeId::from_bytes(&[0u8; 3]).unwrap_err();
/// assert!(matches!(err, CommonError::InvalidLength { what: "node id", .. }));
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    /// A binary identifier had the wrong size.
    #[error("Invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Kind of identifier being decoded
        what: &'static str,
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// A textual node id could not be parsed.
    #[error("Invalid node id: {0}")]
    InvalidNodeId(#[from] NodeIdError),
}

impl CommonError {
    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            what,
            expected,
            actual,
        }
    }

    /// Returns `true` for binary (wire) decoding failures, `false` for
    /// textual ones from configuration or the command line.
    #[must_use]
    pub const fn is_wire_error(&self) -> bool {
        matches!(self, Self::InvalidLength { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_length("node id", 24, 3);
        assert_eq!(err.to_string(), "Invalid node id length: expected 24, got 3");
        assert!(err.is_wire_error());
    }

    #[test]
    fn test_node_id_error_conversion() {
        let err: CommonError = "bogus".parse::<NodeId>().unwrap_err().into();
        assert!(matches!(err, CommonError::InvalidNodeId(NodeIdError::MissingSeparator)));
        assert!(!err.is_wire_error());
    }
}
