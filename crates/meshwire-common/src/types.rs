// ============================================
// File: crates/meshwire-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifiers every meshwire crate passes around, so that
//! node ids, actor ids and connection handles cannot be confused with each
//! other or with plain integers.
//!
//! ## Main Functionality
//! - `NodeId`: Identity of a participating process (host id + process id)
//! - `ActorId`: Identifier of an actor, scoped to its owning node
//! - `ActorAddr`: Fully qualified actor address (node + actor)
//! - `ConnectionHandle`: Transport-assigned handle of a live connection
//! - `MessageId`: Correlation id carried by dispatched messages
//!
//! ## Main Logical Flow
//! 1. A node generates its own `NodeId` once at startup
//! 2. Ids are written into and read from every wire header
//! 3. Ids key the routing table and the published-actor registry
//!
//! ## ⚠️ Important Note for Next Developer
//! - `NodeId::NONE` and `ActorId::INVALID` are wire sentinels (all zero);
//!   they must never identify a real node or actor
//! - The byte layout of `NodeId` is part of the wire format, do not reorder
//!
//! ## Last Modified
//! v0.1.0 - Initial identifier types

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of the host id part of a `NodeId` in bytes.
pub const HOST_ID_SIZE: usize = 20;

/// Encoded size of a `NodeId` in bytes (host id + little-endian process id).
pub const NODE_ID_SIZE: usize = HOST_ID_SIZE + 4;

// ============================================
// NodeId Error Type
// ============================================

/// Error type for `NodeId` parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIdError {
    /// Missing `#` separator between host id and process id
    MissingSeparator,
    /// Host id is not valid hex of the right length
    InvalidHostId(String),
    /// Process id is not a valid decimal `u32`
    InvalidProcessId(String),
}

impl fmt::Display for NodeIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "Missing '#' separator"),
            Self::InvalidHostId(s) => write!(f, "Invalid host id: {}", s),
            Self::InvalidProcessId(s) => write!(f, "Invalid process id: {}", s),
        }
    }
}

impl std::error::Error for NodeIdError {}

// ============================================
// NodeId
// ============================================

/// Globally unique identifier of a node in the mesh.
///
/// # Wire Format
/// ```text
/// ┌──────────────────────────┬──────────────────┐
/// │   Host ID (20 bytes)     │ Process ID (u32) │
/// └──────────────────────────┴──────────────────┘
/// ```
///
/// # Example
/// ```
/// use meshwire_common::types::NodeId;
///
/// let id = NodeId::generate();
/// assert!(!id.is_none());
///
/// let parsed: NodeId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId {
    host_id: [u8; HOST_ID_SIZE],
    process_id: u32,
}

impl NodeId {
    /// The "none" sentinel: unknown or unset node.
    pub const NONE: Self = Self {
        host_id: [0u8; HOST_ID_SIZE],
        process_id: 0,
    };

    /// Creates a `NodeId` from its parts.
    #[must_use]
    pub const fn new(host_id: [u8; HOST_ID_SIZE], process_id: u32) -> Self {
        Self {
            host_id,
            process_id,
        }
    }

    /// Generates a random host id paired with the current process id.
    #[must_use]
    pub fn generate() -> Self {
        let mut host_id = [0u8; HOST_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut host_id);
        Self::new(host_id, std::process::id())
    }

    /// Returns `true` for the "none" sentinel.
    #[must_use]
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Returns the host id part.
    #[must_use]
    pub const fn host_id(&self) -> &[u8; HOST_ID_SIZE] {
        &self.host_id
    }

    /// Returns the process id part.
    #[must_use]
    pub const fn process_id(&self) -> u32 {
        self.process_id
    }

    /// Encodes the id into its fixed wire representation.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; NODE_ID_SIZE] {
        let mut out = [0u8; NODE_ID_SIZE];
        out[..HOST_ID_SIZE].copy_from_slice(&self.host_id);
        out[HOST_ID_SIZE..].copy_from_slice(&self.process_id.to_le_bytes());
        out
    }

    /// Decodes an id from exactly `NODE_ID_SIZE` bytes.
    ///
    /// # Errors
    /// `InvalidLength` if `bytes` has any other size.
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        if bytes.len() != NODE_ID_SIZE {
            return Err(CommonError::invalid_length("node id", NODE_ID_SIZE, bytes.len()));
        }
        let mut host_id = [0u8; HOST_ID_SIZE];
        host_id.copy_from_slice(&bytes[..HOST_ID_SIZE]);
        let mut pid = [0u8; 4];
        pid.copy_from_slice(&bytes[HOST_ID_SIZE..]);
        Ok(Self::new(host_id, u32::from_le_bytes(pid)))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form: first 4 bytes of the host id
        write!(f, "NodeId({}..#{})", hex::encode(&self.host_id[..4]), self.process_id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", hex::encode(self.host_id), self.process_id)
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, pid) = s.split_once('#').ok_or(NodeIdError::MissingSeparator)?;

        let mut host_id = [0u8; HOST_ID_SIZE];
        hex::decode_to_slice(host, &mut host_id)
            .map_err(|_| NodeIdError::InvalidHostId(host.to_string()))?;

        let process_id = pid
            .parse::<u32>()
            .map_err(|_| NodeIdError::InvalidProcessId(pid.to_string()))?;

        Ok(Self::new(host_id, process_id))
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            Self::from_bytes(&bytes)
                .map_err(|_| serde::de::Error::invalid_length(bytes.len(), &"24 bytes"))
        }
    }
}

// ============================================
// ActorId
// ============================================

/// Identifier of an actor, unique within its owning node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(u64);

impl ActorId {
    /// The "no actor" sentinel.
    pub const INVALID: Self = Self(0);

    /// Creates an `ActorId` from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns `false` for the invalid sentinel.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

impl From<u64> for ActorId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================
// ActorAddr
// ============================================

/// Address of an actor anywhere in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorAddr {
    /// Node hosting the actor
    pub node: NodeId,
    /// Actor within that node
    pub actor: ActorId,
}

impl ActorAddr {
    /// Creates an address from its parts.
    #[must_use]
    pub const fn new(node: NodeId, actor: ActorId) -> Self {
        Self { node, actor }
    }
}

impl fmt::Display for ActorAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.actor.value(), self.node)
    }
}

// ============================================
// ConnectionHandle
// ============================================

/// Opaque handle the transport assigns to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    /// Creates a handle from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hdl#{}", self.0)
    }
}

// ============================================
// MessageId
// ============================================

/// Correlation id of a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MessageId(u64);

impl MessageId {
    /// Creates a message id from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_generation() {
        let a = NodeId::generate();
        let b = NodeId::generate();

        assert_ne!(a, b);
        assert!(!a.is_none());
        assert_eq!(a.process_id(), std::process::id());
    }

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(NodeId::default().is_none());
        assert_eq!(NodeId::NONE.to_bytes(), [0u8; NODE_ID_SIZE]);
    }

    #[test]
    fn test_node_id_bytes_roundtrip() {
        let id = NodeId::new([7u8; HOST_ID_SIZE], 4242);
        let bytes = id.to_bytes();
        assert_eq!(&bytes[HOST_ID_SIZE..], &4242u32.to_le_bytes());
        assert_eq!(NodeId::from_bytes(&bytes).unwrap(), id);

        assert!(NodeId::from_bytes(&bytes[..10]).is_err());
    }

    #[test]
    fn test_node_id_string_roundtrip() {
        let id = NodeId::generate();
        let s = id.to_string();
        assert_eq!(s.len(), HOST_ID_SIZE * 2 + 1 + id.process_id().to_string().len());

        let parsed: NodeId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_node_id_text_format() {
        let mut host = [0u8; HOST_ID_SIZE];
        host[0] = 0xab;
        host[HOST_ID_SIZE - 1] = 0x0f;
        let id = NodeId::new(host, 42);

        let expected = format!("ab{}0f#42", "00".repeat(HOST_ID_SIZE - 2));
        assert_eq!(id.to_string(), expected);
        assert_eq!(format!("{:?}", id), "NodeId(ab000000..#42)");
        assert_eq!(expected.to_uppercase().parse::<NodeId>(), Ok(id));

        // odd length and wrong length are both rejected
        assert!(matches!("abc#1".parse::<NodeId>(), Err(NodeIdError::InvalidHostId(_))));
        assert!(matches!(
            format!("{}#1", "00".repeat(HOST_ID_SIZE + 1)).parse::<NodeId>(),
            Err(NodeIdError::InvalidHostId(_))
        ));
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert_eq!("abcdef".parse::<NodeId>(), Err(NodeIdError::MissingSeparator));
        assert!(matches!("zz#1".parse::<NodeId>(), Err(NodeIdError::InvalidHostId(_))));

        let host = "00".repeat(HOST_ID_SIZE);
        assert!(matches!(
            format!("{}#notanumber", host).parse::<NodeId>(),
            Err(NodeIdError::InvalidProcessId(_))
        ));
    }

    #[test]
    fn test_node_id_json_serialization() {
        let id = NodeId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let restored: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn test_actor_id_validity() {
        assert!(!ActorId::INVALID.is_valid());
        assert!(ActorId::new(1).is_valid());
        assert_eq!(ActorId::from(9).value(), 9);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(ConnectionHandle::new(3).to_string(), "hdl#3");
        assert_eq!(ActorId::new(5).to_string(), "actor#5");

        let node = NodeId::new([0u8; HOST_ID_SIZE], 1);
        let addr = ActorAddr::new(node, ActorId::new(5));
        assert!(addr.to_string().starts_with("5@"));
    }
}
