// ============================================
// File: crates/meshwire-node/src/handlers/local.rs
// ============================================
//! # Local Runtime
//!
//! ## Creation Reason
//! The node binary has no actor system behind it. `LocalRuntime` is the
//! callee the runner plugs into the engine: it keeps the bookkeeping an
//! actor runtime would keep per remote node and logs delivered messages.
//!
//! ## Main Functionality
//! - Handshaken peers and the actor each one published
//! - Remote actors known through dispatches and handshakes (proxies)
//! - Local actors remote nodes announced a proxy for
//! - `purge_state`: Forget everything about a node
//!
//! ## Local Delivery
//! ```text
//! ServerHandshake ──► peer + published actor as proxy
//! ClientHandshake ──► peer
//! Dispatch        ──► decode payload, remember sender proxy
//! AnnounceProxy   ──► remember dest_actor announced by source
//! KillProxy       ──► decode reason, forget source_actor proxy
//! Heartbeat       ──► nothing
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Undecodable payloads are delivery failures and close the connection
//!
//! ## Last Modified
//! v0.1.0 - Initial local runtime

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, trace};

use meshwire_common::types::{ActorId, NodeId};
use meshwire_core::protocol::{
    ClientHandshakePayload, DispatchPayload, KillProxyPayload, MessageType, ServerHandshakePayload,
};

use crate::engine::{Callee, LocalMessage};
use crate::error::Result;

/// What a peer told us in its handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerInfo {
    /// Actor published on the port we connected to; invalid if none.
    pub actor: ActorId,
    /// Interface of that actor.
    pub interface: BTreeSet<String>,
}

/// Callee that tracks per-node state without running actors.
#[derive(Debug, Default)]
pub struct LocalRuntime {
    peers: HashMap<NodeId, PeerInfo>,
    proxies: HashMap<NodeId, BTreeSet<ActorId>>,
    announced: HashMap<NodeId, BTreeSet<ActorId>>,
    delivered: u64,
}

impl LocalRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn peer(&self, node: &NodeId) -> Option<&PeerInfo> {
        self.peers.get(node)
    }

    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Remote actors on `node` this runtime knows of.
    #[must_use]
    pub fn proxies(&self, node: &NodeId) -> Option<&BTreeSet<ActorId>> {
        self.proxies.get(node)
    }

    /// Local actors `node` announced a proxy for.
    #[must_use]
    pub fn announced(&self, node: &NodeId) -> Option<&BTreeSet<ActorId>> {
        self.announced.get(node)
    }

    /// Number of messages accepted so far.
    #[must_use]
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }

    fn add_proxy(&mut self, node: NodeId, actor: ActorId) {
        if actor.is_valid() && self.proxies.entry(node).or_default().insert(actor) {
            debug!(node = %node, actor = %actor, "Proxy created");
        }
    }
}

impl Callee for LocalRuntime {
    fn purge_state(&mut self, node: &NodeId) {
        let had_peer = self.peers.remove(node).is_some();
        let proxies = self.proxies.remove(node).map_or(0, |p| p.len());
        self.announced.remove(node);
        if had_peer || proxies > 0 {
            info!(node = %node, proxies, "Purged node state");
        }
    }

    fn deliver_local(&mut self, msg: &LocalMessage<'_>) -> Result<()> {
        let hdr = msg.header;
        let source = hdr.source_node;

        match hdr.operation {
            MessageType::ServerHandshake => {
                let handshake = ServerHandshakePayload::decode(msg.payload)?;
                self.add_proxy(source, handshake.actor);
                self.peers.insert(
                    source,
                    PeerInfo {
                        actor: handshake.actor,
                        interface: handshake.interface,
                    },
                );
            }
            MessageType::ClientHandshake => {
                ClientHandshakePayload::decode(msg.payload)?;
                self.peers.entry(source).or_default();
            }
            MessageType::DispatchMessage => {
                let dispatch = DispatchPayload::decode(msg.payload)?;
                self.add_proxy(source, hdr.source_actor);
                trace!(
                    source = %source,
                    receiver = %hdr.dest_actor,
                    mid = hdr.operation_data,
                    hops = dispatch.forwarding_stack.len(),
                    len = dispatch.message.len(),
                    "Message delivered"
                );
            }
            MessageType::AnnounceProxy => {
                self.announced
                    .entry(source)
                    .or_default()
                    .insert(hdr.dest_actor);
                debug!(node = %source, actor = %hdr.dest_actor, "Proxy announced");
            }
            MessageType::KillProxy => {
                let kill = KillProxyPayload::decode(msg.payload)?;
                if let Some(actors) = self.proxies.get_mut(&source) {
                    actors.remove(&hdr.source_actor);
                }
                debug!(
                    node = %source,
                    actor = %hdr.source_actor,
                    reason = %kill.reason,
                    "Proxy killed"
                );
            }
            MessageType::Heartbeat => {}
        }

        self.delivered += 1;
        Ok(())
    }
}

// ============================================
// Tests
// ============================================
