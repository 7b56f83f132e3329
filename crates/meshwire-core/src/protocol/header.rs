// ============================================
// File: crates/meshwire-core/src/protocol/header.rs
// ============================================
//! # Wire Header Definitions
//!
//! ## Creation Reason
//! Every message exchanged between nodes starts with the same fixed-size
//! header. This module defines that header and the per-operation rules
//! that make a header structurally valid.
//!
//! ## Main Functionality
//! - `MessageType`: The six wire operations
//! - `Header`: The decoded fixed-size record
//! - `Header::validate`: Structural validity per operation
//!
//! ## Wire Format (Little Endian, 80 bytes)
//! ```text
//! ┌────────┬──────────┬─────────────┬────────────────┐
//! │ op (1) │ rsv (3)  │ payload (4) │ op_data (8)    │  0..16
//! ├────────┴──────────┴─────────────┴────────────────┤
//! │ source_node (24)                                 │ 16..40
//! ├──────────────────────────────────────────────────┤
//! │ dest_node (24)                                   │ 40..64
//! ├─────────────────────────┬────────────────────────┤
//! │ source_actor (8)        │ dest_actor (8)         │ 64..80
//! └─────────────────────────┴────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Field order is part of the wire format - DO NOT reorder without
//!   bumping `PROTOCOL_VERSION`
//! - Add new operations at the end of the enum
//!
//! ## Last Modified
//! v0.1.0 - Initial header definitions

use serde::{Deserialize, Serialize};

use meshwire_common::types::{ActorId, NodeId, NODE_ID_SIZE};

use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Encoded size of a `Header` in bytes.
pub const HEADER_SIZE: usize = 1 + 3 + 4 + 8 + NODE_ID_SIZE * 2 + 8 * 2;

// ============================================
// MessageType
// ============================================

/// Operation carried by a header.
///
/// # Values
/// | Value | Operation |
/// |-------|-----------|
/// | 0x00 | ClientHandshake |
/// | 0x01 | ServerHandshake |
/// | 0x02 | DispatchMessage |
/// | 0x03 | AnnounceProxy |
/// | 0x04 | KillProxy |
/// | 0x05 | Heartbeat |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Reply of the connecting node, carries the application identifier.
    ClientHandshake = 0x00,
    /// First message on a new connection, sent by the accepting node.
    ServerHandshake = 0x01,
    /// Application message addressed to a remote actor.
    DispatchMessage = 0x02,
    /// A proxy for `dest_actor` was created on the sending node.
    AnnounceProxy = 0x03,
    /// `source_actor` terminated; proxies for it must be torn down.
    KillProxy = 0x04,
    /// Liveness probe on a direct connection (no payload).
    Heartbeat = 0x05,
}

impl MessageType {
    /// All operations, in wire order.
    pub const ALL: [Self; 6] = [
        Self::ClientHandshake,
        Self::ServerHandshake,
        Self::DispatchMessage,
        Self::AnnounceProxy,
        Self::KillProxy,
        Self::Heartbeat,
    ];

    /// Converts a byte to a `MessageType`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::ClientHandshake),
            0x01 => Some(Self::ServerHandshake),
            0x02 => Some(Self::DispatchMessage),
            0x03 => Some(Self::AnnounceProxy),
            0x04 => Some(Self::KillProxy),
            0x05 => Some(Self::Heartbeat),
            _ => None,
        }
    }

    /// Converts the `MessageType` to its byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Checks if this is a handshake operation.
    #[must_use]
    pub const fn is_handshake(&self) -> bool {
        matches!(self, Self::ClientHandshake | Self::ServerHandshake)
    }

    /// Checks if this is a heartbeat.
    #[must_use]
    pub const fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Heartbeat)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(value)
    }
}

impl From<MessageType> for u8 {
    fn from(msg_type: MessageType) -> Self {
        msg_type.as_byte()
    }
}

// ============================================
// Header
// ============================================

/// Fixed-size record prefixed to every message.
///
/// `payload_len` always equals the byte length of the payload that
/// follows on the wire. `operation_data` holds the protocol version for
/// server handshakes, the correlation id for dispatches, zero otherwise.
///
/// # Example
/// ```
/// use meshwire_common::types::{ActorId, NodeId};
/// use meshwire_core::protocol::{Header, MessageType};
///
/// let a = NodeId::generate();
/// let b = NodeId::new([1u8; 20], 7);
/// let hdr = Header::new(MessageType::Heartbeat, 0, a, b, ActorId::INVALID, ActorId::INVALID);
/// assert!(hdr.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Operation of this message.
    pub operation: MessageType,
    /// Byte length of the trailing payload.
    pub payload_len: u32,
    /// Operation-dependent data.
    pub operation_data: u64,
    /// Node that produced the message.
    pub source_node: NodeId,
    /// Node the message is addressed to.
    pub dest_node: NodeId,
    /// Sending actor, or `ActorId::INVALID`.
    pub source_actor: ActorId,
    /// Receiving actor, or `ActorId::INVALID`.
    pub dest_actor: ActorId,
}

impl Header {
    /// Creates a header with `payload_len = 0`.
    ///
    /// The length is filled in when the message is written.
    #[must_use]
    pub const fn new(
        operation: MessageType,
        operation_data: u64,
        source_node: NodeId,
        dest_node: NodeId,
        source_actor: ActorId,
        dest_actor: ActorId,
    ) -> Self {
        Self {
            operation,
            payload_len: 0,
            operation_data,
            source_node,
            dest_node,
            source_actor,
            dest_actor,
        }
    }

    /// Returns `true` if a message with this header must be relayed
    /// instead of being processed by `this_node`.
    ///
    /// Handshakes and heartbeats are always local.
    #[must_use]
    pub fn requires_forwarding(&self, this_node: &NodeId) -> bool {
        !self.operation.is_handshake()
            && !self.operation.is_heartbeat()
            && self.dest_node != *this_node
    }

    /// Returns `true` if the header passes [`Header::validate`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Checks that the node, actor and length fields are consistent with
    /// the operation.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidHeader` naming the first violated rule.
    pub fn validate(&self) -> Result<()> {
        let op = self.operation;
        let fail = |reason| Err(CoreError::invalid_header(op, reason));

        match op {
            MessageType::ServerHandshake => {
                if self.source_node.is_none() {
                    return fail("source node must be set");
                }
                if self.dest_actor.is_valid() {
                    return fail("destination actor must be invalid");
                }
                if self.operation_data == 0 {
                    return fail("protocol version must be non-zero");
                }
                if self.payload_len == 0 {
                    return fail("payload must not be empty");
                }
            }
            MessageType::ClientHandshake => {
                self.check_distinct_nodes()?;
                if self.source_actor.is_valid() || self.dest_actor.is_valid() {
                    return fail("actor ids must be invalid");
                }
            }
            MessageType::DispatchMessage => {
                if self.dest_node.is_none() {
                    return fail("destination node must be set");
                }
                if !self.dest_actor.is_valid() {
                    return fail("destination actor must be set");
                }
                if self.payload_len == 0 {
                    return fail("payload must not be empty");
                }
            }
            MessageType::AnnounceProxy => {
                self.check_distinct_nodes()?;
                if self.source_actor.is_valid() {
                    return fail("source actor must be invalid");
                }
                if !self.dest_actor.is_valid() {
                    return fail("destination actor must be set");
                }
                if self.payload_len != 0 {
                    return fail("payload must be empty");
                }
                if self.operation_data != 0 {
                    return fail("operation data must be zero");
                }
            }
            MessageType::KillProxy => {
                self.check_distinct_nodes()?;
                if !self.source_actor.is_valid() {
                    return fail("source actor must be set");
                }
                if self.dest_actor.is_valid() {
                    return fail("destination actor must be invalid");
                }
                if self.payload_len == 0 {
                    return fail("payload must carry an exit reason");
                }
                if self.operation_data != 0 {
                    return fail("operation data must be zero");
                }
            }
            MessageType::Heartbeat => {
                self.check_distinct_nodes()?;
                if self.source_actor.is_valid() || self.dest_actor.is_valid() {
                    return fail("actor ids must be invalid");
                }
                if self.payload_len != 0 {
                    return fail("payload must be empty");
                }
                if self.operation_data != 0 {
                    return fail("operation data must be zero");
                }
            }
        }
        Ok(())
    }

    fn check_distinct_nodes(&self) -> Result<()> {
        if self.source_node.is_none() || self.dest_node.is_none() {
            return Err(CoreError::invalid_header(
                self.operation,
                "source and destination nodes must be set",
            ));
        }
        if self.source_node == self.dest_node {
            return Err(CoreError::invalid_header(
                self.operation,
                "source and destination nodes must differ",
            ));
        }
        Ok(())
    }
}

impl Default for Header {
    /// An all-zero heartbeat header; structurally invalid.
    fn default() -> Self {
        Self::new(
            MessageType::Heartbeat,
            0,
            NodeId::NONE,
            NodeId::NONE,
            ActorId::INVALID,
            ActorId::INVALID,
        )
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u8) -> NodeId {
        NodeId::new([n; 20], u32::from(n))
    }

    fn header(op: MessageType) -> Header {
        Header::new(op, 0, node(1), node(2), ActorId::INVALID, ActorId::INVALID)
    }

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 80);
    }

    #[test]
    fn test_message_type_roundtrip() {
        for msg_type in MessageType::ALL {
            assert_eq!(MessageType::from_byte(msg_type.as_byte()), Some(msg_type));
            assert_eq!(MessageType::try_from(u8::from(msg_type)), Ok(msg_type));
        }
        assert!(MessageType::from_byte(0x06).is_none());
        assert_eq!(MessageType::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_message_type_classification() {
        assert!(MessageType::ClientHandshake.is_handshake());
        assert!(MessageType::ServerHandshake.is_handshake());
        assert!(!MessageType::DispatchMessage.is_handshake());
        assert!(MessageType::Heartbeat.is_heartbeat());
        assert!(!MessageType::KillProxy.is_heartbeat());
    }

    #[test]
    fn test_heartbeat_validity() {
        assert!(header(MessageType::Heartbeat).is_valid());

        let mut hdr = header(MessageType::Heartbeat);
        hdr.source_actor = ActorId::new(1);
        assert!(!hdr.is_valid());

        let mut hdr = header(MessageType::Heartbeat);
        hdr.dest_node = hdr.source_node;
        assert!(!hdr.is_valid());

        let mut hdr = header(MessageType::Heartbeat);
        hdr.payload_len = 4;
        assert!(!hdr.is_valid());

        assert!(!Header::default().is_valid());
    }

    #[test]
    fn test_server_handshake_validity() {
        let mut hdr = header(MessageType::ServerHandshake);
        hdr.dest_node = NodeId::NONE;
        hdr.source_actor = ActorId::new(9);
        hdr.operation_data = 1;
        hdr.payload_len = 16;
        assert!(hdr.is_valid());

        hdr.operation_data = 0;
        assert!(matches!(
            hdr.validate(),
            Err(CoreError::InvalidHeader { operation: MessageType::ServerHandshake, .. })
        ));
    }

    #[test]
    fn test_dispatch_validity() {
        let mut hdr = header(MessageType::DispatchMessage);
        hdr.source_node = NodeId::NONE;
        hdr.dest_actor = ActorId::new(3);
        hdr.payload_len = 8;
        assert!(hdr.is_valid());

        hdr.dest_actor = ActorId::INVALID;
        assert!(!hdr.is_valid());
    }

    #[test]
    fn test_proxy_validity() {
        let mut announce = header(MessageType::AnnounceProxy);
        announce.dest_actor = ActorId::new(5);
        assert!(announce.is_valid());
        announce.payload_len = 1;
        assert!(!announce.is_valid());

        let mut kill = header(MessageType::KillProxy);
        kill.source_actor = ActorId::new(5);
        kill.payload_len = 8;
        assert!(kill.is_valid());
        kill.operation_data = 1;
        assert!(!kill.is_valid());
    }

    #[test]
    fn test_requires_forwarding() {
        let this = node(1);
        let mut hdr = header(MessageType::DispatchMessage);
        hdr.dest_node = node(3);
        assert!(hdr.requires_forwarding(&this));

        hdr.dest_node = this;
        assert!(!hdr.requires_forwarding(&this));

        let mut beat = header(MessageType::Heartbeat);
        beat.dest_node = node(3);
        assert!(!beat.requires_forwarding(&this));
    }
}
