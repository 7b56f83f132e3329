// ============================================
// File: crates/meshwire-node/src/engine/callee.rs
// ============================================
//! # Callee
//!
//! The actor runtime as seen by the engine: it receives messages addressed
//! to this node and is told when a node became unreachable.

use meshwire_common::types::{ConnectionHandle, NodeId};
use meshwire_core::protocol::Header;

use crate::error::Result;

/// Where a locally delivered message arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A stream connection.
    Stream(ConnectionHandle),
    /// A datagram endpoint bound to `port`.
    Datagram {
        /// Datagram endpoint.
        handle: ConnectionHandle,
        /// Local port it arrived on.
        port: u16,
    },
}

impl Origin {
    #[must_use]
    pub const fn handle(&self) -> ConnectionHandle {
        match self {
            Self::Stream(handle) | Self::Datagram { handle, .. } => *handle,
        }
    }
}

/// A fully received message addressed to this node.
#[derive(Debug, Clone, Copy)]
pub struct LocalMessage<'a> {
    pub origin: Origin,
    pub header: &'a Header,
    pub payload: &'a [u8],
}

/// Receiver of local messages and unreachable-node notifications.
pub trait Callee: Send {
    /// Drops any state cached for `node`.
    ///
    /// Must be idempotent and accept `NodeId::NONE` as a no-op.
    fn purge_state(&mut self, node: &NodeId);

    /// Processes a message addressed to this node.
    ///
    /// # Errors
    /// An error closes the connection the message arrived on.
    fn deliver_local(&mut self, msg: &LocalMessage<'_>) -> Result<()>;
}
