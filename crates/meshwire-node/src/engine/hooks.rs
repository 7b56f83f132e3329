// ============================================
// File: crates/meshwire-node/src/engine/hooks.rs
// ============================================
//! # Engine Hooks
//!
//! Advisory notifications. Hooks observe the engine and never change what
//! it does; every method defaults to a no-op.

use bytes::Bytes;

use meshwire_common::types::{ActorAddr, ActorId, MessageId, NodeId};
use meshwire_core::protocol::Header;

/// Observer of engine events.
#[allow(unused_variables)]
pub trait EngineHooks: Send {
    /// A message was relayed towards `hdr.dest_node` via `next_hop`.
    fn message_forwarded(&mut self, hdr: &Header, payload: &[u8], next_hop: &NodeId) {}

    /// A message could not be relayed: no route to `hdr.dest_node`.
    fn message_forwarding_failed(&mut self, hdr: &Header, payload: &[u8]) {}

    /// A locally originated message could not be sent.
    fn message_sending_failed(
        &mut self,
        sender: Option<&ActorAddr>,
        receiver: &ActorAddr,
        mid: MessageId,
        message: &Bytes,
    ) {
    }

    /// A locally originated message was written towards `next_hop`.
    fn message_sent(
        &mut self,
        sender: Option<&ActorAddr>,
        next_hop: &NodeId,
        receiver: &ActorAddr,
        mid: MessageId,
        message: &Bytes,
    ) {
    }

    /// `actor` was published on `port`.
    fn actor_published(&mut self, actor: ActorId, port: u16) {}
}
