// ============================================
// File: crates/meshwire-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types for wire-format operations: header decoding,
//! structural validation, payload encoding and decoding.
//!
//! ## Main Functionality
//! - `CoreError`: Primary error enum for protocol operations
//! - `Result<T>`: Type alias using `CoreError`
//!
//! ## Error Categories
//! 1. **Decoding Errors**: Truncated buffers, unknown operations, bad strings
//! 2. **Validation Errors**: Header fields inconsistent with the operation
//! 3. **Encoding Errors**: Payloads that do not fit the wire limits
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every protocol error is fatal to the connection that produced it;
//!   callers rely on `is_protocol_error` to decide that
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use meshwire_common::error::CommonError;

use crate::protocol::header::MessageType;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for wire protocol operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Decoding Errors
    // ========================================

    /// Unknown or unsupported operation code.
    #[error("Unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),

    /// Message is malformed.
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What's wrong with the message
        reason: String,
    },

    /// Message is too short to be valid.
    #[error("Message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// Decoded payload left unread bytes behind.
    #[error("Trailing data: {remaining} unread bytes after {context}")]
    TrailingData {
        /// What was being decoded
        context: &'static str,
        /// Number of bytes left over
        remaining: usize,
    },

    // ========================================
    // Validation Errors
    // ========================================

    /// Header fields are inconsistent with its operation.
    #[error("Invalid {operation:?} header: {reason}")]
    InvalidHeader {
        /// Operation of the offending header
        operation: MessageType,
        /// Which rule was violated
        reason: &'static str,
    },

    /// Protocol version mismatch.
    #[error("Unsupported protocol version: {got}, expected {expected}")]
    UnsupportedVersion {
        /// Version received
        got: u64,
        /// Version expected
        expected: u64,
    },

    // ========================================
    // Encoding Errors
    // ========================================

    /// Payload exceeds what the 32-bit length field can describe.
    #[error("Payload too large: max {max} bytes, got {actual}")]
    PayloadTooLarge {
        /// Maximum allowed size
        max: usize,
        /// Actual size produced
        actual: usize,
    },

    /// A payload writer failed while appending its bytes.
    #[error("Payload encoding failed: {reason}")]
    Encoding {
        /// Why encoding failed
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `MalformedMessage` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Creates a `MessageTooShort` error.
    #[must_use]
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates an `InvalidHeader` error.
    #[must_use]
    pub const fn invalid_header(operation: MessageType, reason: &'static str) -> Self {
        Self::InvalidHeader { operation, reason }
    }

    /// Creates an `Encoding` error.
    pub fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding {
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a protocol error caused by received bytes.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMessageType(_)
                | Self::MalformedMessage { .. }
                | Self::MessageTooShort { .. }
                | Self::TrailingData { .. }
                | Self::InvalidHeader { .. }
                | Self::UnsupportedVersion { .. }
        )
    }

    /// Returns `true` if this error was raised while producing bytes.
    #[must_use]
    pub const fn is_encoding_error(&self) -> bool {
        matches!(self, Self::PayloadTooLarge { .. } | Self::Encoding { .. })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::too_short(80, 12);
        assert!(err.to_string().contains("80"));
        assert!(err.to_string().contains("12"));

        let err = CoreError::invalid_header(MessageType::Heartbeat, "actor ids must be invalid");
        assert!(err.to_string().contains("Heartbeat"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::UnknownMessageType(0xFF).is_protocol_error());
        assert!(!CoreError::UnknownMessageType(0xFF).is_encoding_error());

        let too_large = CoreError::PayloadTooLarge { max: 1, actual: 2 };
        assert!(too_large.is_encoding_error());
        assert!(!too_large.is_protocol_error());
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_length("node id", 24, 3);
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
    }
}
