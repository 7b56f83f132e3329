// ============================================
// File: crates/meshwire-node/src/error.rs
// ============================================
//! # Node Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use meshwire_common::error::CommonError;
use meshwire_common::types::NodeId;
use meshwire_core::error::CoreError;
use meshwire_transport::error::TransportError;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Node error types.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    #[error("Engine requires a valid node id")]
    InvalidThisNode,

    #[error("Payload length mismatch: header announced {expected} bytes, got {actual}")]
    PayloadMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("Truncated datagram record: need {expected} bytes, {actual} left")]
    TruncatedRecord {
        expected: usize,
        actual: usize,
    },

    #[error("Forwarding to {destination} is not supported on datagram connections")]
    ForwardingUnsupported {
        destination: NodeId,
    },

    #[error("Application identifier mismatch: expected '{expected}', got '{got}'")]
    AppIdentifierMismatch {
        expected: String,
        got: String,
    },

    #[error("Refusing handshake: connected to self")]
    ConnectedToSelf,

    #[error("Redundant connection to {node}")]
    RedundantConnection {
        node: NodeId,
    },

    #[error("No route to {node}")]
    NoRoute {
        node: NodeId,
    },

    #[error("Receiver {node} is this node")]
    LocalReceiver {
        node: NodeId,
    },

    #[error("Local delivery rejected: {reason}")]
    DeliveryRejected {
        reason: String,
    },

    #[error("Node failed to start: {reason}")]
    StartupFailed {
        reason: String,
    },

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn delivery_rejected(reason: impl Into<String>) -> Self {
        Self::DeliveryRejected {
            reason: reason.into(),
        }
    }

    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Errors raised while processing received bytes; each one ends the
    /// connection it came from.
    #[must_use]
    pub const fn closes_connection(&self) -> bool {
        match self {
            Self::PayloadMismatch { .. }
            | Self::TruncatedRecord { .. }
            | Self::ForwardingUnsupported { .. }
            | Self::AppIdentifierMismatch { .. }
            | Self::ConnectedToSelf
            | Self::RedundantConnection { .. }
            | Self::DeliveryRejected { .. } => true,
            Self::Core(e) => e.is_protocol_error(),
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. } | Self::InvalidThisNode | Self::StartupFailed { .. }
        )
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::NoRoute { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NodeError::config_load("/etc/meshwire/node.toml", "file not found");
        assert!(err.to_string().contains("/etc/meshwire/node.toml"));
    }

    #[test]
    fn test_error_classification() {
        let config_err = NodeError::config_invalid("middleman.app_identifier", "empty");
        assert!(config_err.is_config_error());
        assert!(!config_err.is_fatal());

        assert!(NodeError::ConnectedToSelf.closes_connection());
        assert!(NodeError::Core(CoreError::UnknownMessageType(9)).closes_connection());
        assert!(!NodeError::NoRoute { node: NodeId::NONE }.closes_connection());
        assert!(NodeError::NoRoute { node: NodeId::NONE }.is_retryable());
    }
}
