// ============================================
// File: crates/meshwire-node/src/engine/instance.rs
// ============================================
//! # Protocol Engine Instance
//!
//! ## Creation Reason
//! Orchestrates the node-to-node protocol: decodes received chunks,
//! drives the per-connection receive state machine, and decides whether
//! a message is delivered locally, relayed to another node or dropped.
//!
//! ## Main Functionality
//! - `handle`: One stream chunk (header or payload) per call
//! - `handle_datagram`: Back-to-back records in one buffer, no relaying
//! - Handshake bookkeeping and indirect route learning
//! - Cleanup: route removal plus `Callee::purge_state` per lost node
//! - Outgoing control messages and dispatch
//!
//! ## Message Flow
//! ```text
//!  chunk ──► decode ──► validate ──► payload? ──► AwaitPayload
//!                                      │
//!                                      ▼
//!                       dest == this? ──yes──► bookkeeping ──► Callee
//!                            │no
//!                            ▼
//!                     route? ──yes──► relay + flush
//!                            │no
//!                            ▼
//!                          drop (warn + hook)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every error from processing received bytes closes the connection
//!   and runs cleanup before `CloseConnection` is returned
//! - Unreachable destinations are not errors; the connection stays open
//! - Not synchronized; the runner wraps the instance in a mutex
//!
//! ## Last Modified
//! v0.1.0 - Initial engine implementation

use std::collections::BTreeSet;

use bytes::Bytes;
use tracing::{debug, error, info, trace, warn};

use meshwire_common::types::{ActorAddr, ActorId, ConnectionHandle, MessageId, NodeId};
use meshwire_core::error::CoreError;
use meshwire_core::protocol::{
    decode_header, encode_header, ClientHandshakePayload, ConnectionState, DispatchPayload,
    ExitReason, Header, HeaderCodec, MessageType, PayloadWriter, ProtocolVersion,
    ServerHandshakePayload, HEADER_SIZE, PROTOCOL_VERSION,
};
use meshwire_transport::{NewDataMsg, NewDatagramMsg, Transport};

use crate::engine::callee::{Callee, LocalMessage, Origin};
use crate::engine::hooks::EngineHooks;
use crate::engine::writer::MessageWriter;
use crate::error::{NodeError, Result};
use crate::services::{PublishedActor, PublishedActors, Route, RoutingTable};

// ============================================
// Instance
// ============================================

/// Protocol engine of one node.
pub struct Instance<T, C> {
    writer: MessageWriter,
    routing: RoutingTable<T>,
    published: PublishedActors,
    callee: C,
    hooks: Vec<Box<dyn EngineHooks>>,
}

impl<T: Transport, C: Callee> Instance<T, C> {
    /// Creates an engine for `this_node`.
    ///
    /// # Errors
    /// `InvalidThisNode` if `this_node` is `NodeId::NONE`.
    pub fn new(
        this_node: NodeId,
        app_identifier: impl Into<String>,
        transport: T,
        callee: C,
    ) -> Result<Self> {
        if this_node.is_none() {
            return Err(NodeError::InvalidThisNode);
        }

        Ok(Self {
            writer: MessageWriter::new(this_node, app_identifier),
            routing: RoutingTable::new(transport),
            published: PublishedActors::new(),
            callee,
            hooks: Vec::new(),
        })
    }

    #[must_use]
    pub const fn this_node(&self) -> &NodeId {
        self.writer.this_node()
    }

    #[must_use]
    pub fn app_identifier(&self) -> &str {
        self.writer.app_identifier()
    }

    /// Registers an observer.
    pub fn add_hook(&mut self, hook: impl EngineHooks + 'static) {
        self.hooks.push(Box::new(hook));
    }

    // ========================================
    // Receiving
    // ========================================

    /// Processes one chunk received on a stream connection.
    ///
    /// With `is_payload == false` the chunk is a header, decoded into
    /// `hdr`; otherwise it is the payload announced by `hdr`. Returns the
    /// state that determines what the caller reads next.
    pub fn handle(
        &mut self,
        msg: &NewDataMsg<'_>,
        hdr: &mut Header,
        is_payload: bool,
    ) -> ConnectionState {
        match self.process_stream(msg, hdr, is_payload) {
            Ok(state) => state,
            Err(e) => {
                if e.closes_connection() {
                    warn!(handle = %msg.handle, error = %e, "Closing connection");
                } else {
                    error!(
                        handle = %msg.handle,
                        error = %e,
                        "Closing connection after local failure"
                    );
                }
                self.cleanup(msg.handle);
                ConnectionState::CloseConnection
            }
        }
    }

    fn process_stream(
        &mut self,
        msg: &NewDataMsg<'_>,
        hdr: &mut Header,
        is_payload: bool,
    ) -> Result<ConnectionState> {
        let payload: &[u8] = if is_payload {
            if msg.buf.len() != hdr.payload_len as usize {
                return Err(NodeError::PayloadMismatch {
                    expected: hdr.payload_len as usize,
                    actual: msg.buf.len(),
                });
            }
            msg.buf
        } else {
            if msg.buf.len() != HEADER_SIZE {
                return Err(CoreError::malformed(format!(
                    "header chunk of {} bytes, expected {HEADER_SIZE}",
                    msg.buf.len()
                ))
                .into());
            }
            *hdr = decode_header(msg.buf)?;
            hdr.validate()?;
            trace!(
                handle = %msg.handle,
                operation = ?hdr.operation,
                payload_len = hdr.payload_len,
                "Header received"
            );

            if hdr.payload_len > 0 {
                return Ok(ConnectionState::AwaitPayload);
            }
            &[]
        };

        if hdr.requires_forwarding(self.this_node()) {
            self.forward(hdr, payload);
        } else {
            self.handle_msg(Origin::Stream(msg.handle), hdr, payload)?;
        }
        Ok(ConnectionState::AwaitHeader)
    }

    /// Processes a datagram holding one or more complete records.
    ///
    /// # Errors
    /// Truncated records, invalid headers, rejected deliveries and records
    /// that would need relaying abort the datagram; routes on its handle
    /// are cleaned up before the error is returned.
    pub fn handle_datagram(&mut self, msg: &NewDatagramMsg<'_>) -> Result<()> {
        let result = self.process_datagram(msg);
        if let Err(e) = &result {
            warn!(handle = %msg.handle, port = msg.port, error = %e, "Dropping datagram");
            self.cleanup(msg.handle);
        }
        result
    }

    fn process_datagram(&mut self, msg: &NewDatagramMsg<'_>) -> Result<()> {
        let origin = Origin::Datagram {
            handle: msg.handle,
            port: msg.port,
        };
        let mut rest = msg.buf;

        while !rest.is_empty() {
            let Some(record_len) = HeaderCodec::record_len(rest) else {
                return Err(NodeError::TruncatedRecord {
                    expected: HEADER_SIZE,
                    actual: rest.len(),
                });
            };
            let hdr = decode_header(&rest[..HEADER_SIZE])?;
            hdr.validate()?;

            if rest.len() < record_len {
                return Err(NodeError::TruncatedRecord {
                    expected: record_len,
                    actual: rest.len(),
                });
            }
            if hdr.requires_forwarding(self.this_node()) {
                return Err(NodeError::ForwardingUnsupported {
                    destination: hdr.dest_node,
                });
            }

            self.handle_msg(origin, &hdr, &rest[HEADER_SIZE..record_len])?;
            rest = &rest[record_len..];
        }
        Ok(())
    }

    /// Relays a message addressed to another node, or drops it.
    fn forward(&mut self, hdr: &Header, payload: &[u8]) {
        if let Some(route) = self.routing.lookup(&hdr.dest_node) {
            let buf = self.routing.buffer_mut(route.handle);
            buf.extend_from_slice(&encode_header(hdr));
            buf.extend_from_slice(payload);
            self.routing.flush(&route);

            debug!(
                dest = %hdr.dest_node,
                next_hop = %route.next_hop,
                operation = ?hdr.operation,
                "Message forwarded"
            );
            self.notify(|h| h.message_forwarded(hdr, payload, &route.next_hop));
            return;
        }

        let this_node = *self.this_node();
        if hdr.source_node == this_node {
            warn!(dest = %hdr.dest_node, "Dropping unroutable message with spoofed source");
        } else if self.routing.lookup(&hdr.source_node).is_some() {
            warn!(
                source = %hdr.source_node,
                dest = %hdr.dest_node,
                "No route to destination, no failure signal for reachable source; dropping"
            );
        } else {
            warn!(
                source = %hdr.source_node,
                dest = %hdr.dest_node,
                "No route to destination or source, dropping"
            );
        }
        self.notify(|h| h.message_forwarding_failed(hdr, payload));
    }

    /// Local processing of a message addressed to this node.
    fn handle_msg(&mut self, origin: Origin, hdr: &Header, payload: &[u8]) -> Result<()> {
        let handle = origin.handle();
        match hdr.operation {
            MessageType::ServerHandshake => self.on_server_handshake(handle, hdr, payload)?,
            MessageType::ClientHandshake => self.on_client_handshake(handle, hdr, payload)?,
            MessageType::DispatchMessage | MessageType::AnnounceProxy | MessageType::KillProxy => {
                self.learn_indirect(handle, &hdr.source_node);
            }
            MessageType::Heartbeat => {
                trace!(handle = %handle, source = %hdr.source_node, "Heartbeat received");
            }
        }

        self.callee.deliver_local(&LocalMessage {
            origin,
            header: hdr,
            payload,
        })
    }

    fn on_server_handshake(
        &mut self,
        handle: ConnectionHandle,
        hdr: &Header,
        payload: &[u8],
    ) -> Result<()> {
        let version = ProtocolVersion::from(hdr.operation_data);
        if !version.is_compatible_with(&ProtocolVersion::current()) {
            return Err(CoreError::UnsupportedVersion {
                got: version.as_u64(),
                expected: PROTOCOL_VERSION,
            }
            .into());
        }
        let handshake = ServerHandshakePayload::decode(payload)?;
        self.check_app_identifier(&handshake.app_identifier)?;

        let remote = hdr.source_node;
        if remote == *self.this_node() {
            return Err(NodeError::ConnectedToSelf);
        }
        if self.routing.lookup_direct(&remote).is_some() {
            return Err(NodeError::RedundantConnection { node: remote });
        }

        // The handle must be free before anything is written on it
        if !self.routing.add_direct(handle, remote) {
            return Err(NodeError::RedundantConnection { node: remote });
        }
        self.writer
            .client_handshake(self.routing.buffer_mut(handle), &remote)?;
        self.routing.flush_handle(handle);

        info!(
            handle = %handle,
            node = %remote,
            actor = %handshake.actor,
            "Server handshake accepted"
        );
        Ok(())
    }

    fn on_client_handshake(
        &mut self,
        handle: ConnectionHandle,
        hdr: &Header,
        payload: &[u8],
    ) -> Result<()> {
        let handshake = ClientHandshakePayload::decode(payload)?;
        self.check_app_identifier(&handshake.app_identifier)?;

        let remote = hdr.source_node;
        if self.routing.lookup_direct(&remote).is_some() {
            info!(handle = %handle, node = %remote, "Received second client handshake");
            return Ok(());
        }
        if !self.routing.add_direct(handle, remote) {
            return Err(NodeError::RedundantConnection { node: remote });
        }
        info!(handle = %handle, node = %remote, "Client handshake accepted");
        Ok(())
    }

    fn check_app_identifier(&self, got: &str) -> Result<()> {
        if got == self.app_identifier() {
            return Ok(());
        }
        Err(NodeError::AppIdentifierMismatch {
            expected: self.app_identifier().to_string(),
            got: got.to_string(),
        })
    }

    /// Messages from a node without a direct route make it reachable via
    /// the node on the arrival connection.
    fn learn_indirect(&mut self, handle: ConnectionHandle, source: &NodeId) {
        if source.is_none()
            || source == self.this_node()
            || self.routing.lookup_direct(source).is_some()
        {
            return;
        }
        if let Some(hop) = self.routing.lookup_node(handle) {
            if self.routing.add_indirect(hop, *source) {
                info!(node = %source, hop = %hop, "Indirect route learned");
            }
        }
    }

    // ========================================
    // Connection Lifecycle
    // ========================================

    /// Removes every route through `handle`, purging each lost node.
    fn cleanup(&mut self, handle: ConnectionHandle) {
        let callee = &mut self.callee;
        self.routing
            .erase_handle(handle, |node| callee.purge_state(node));
    }

    /// The transport lost `handle`.
    pub fn handle_connection_lost(&mut self, handle: ConnectionHandle) {
        info!(handle = %handle, "Connection lost");
        self.cleanup(handle);
    }

    /// `node` shut down; its routes and everything relayed through it are
    /// removed. No-op for `NodeId::NONE`.
    pub fn handle_node_shutdown(&mut self, node: &NodeId) {
        if node.is_none() {
            return;
        }
        info!(node = %node, "Node shutdown");
        let callee = &mut self.callee;
        self.routing.erase(node, |lost| callee.purge_state(lost));
    }

    /// Sends a heartbeat on every direct connection.
    pub fn handle_heartbeat(&mut self) {
        for route in self.routing.direct_routes() {
            let written = self
                .writer
                .heartbeat(self.routing.buffer_mut(route.handle), &route.next_hop);
            if written.is_ok() {
                self.routing.flush(&route);
            }
        }
    }

    // ========================================
    // Sending
    // ========================================

    #[must_use]
    pub fn lookup(&self, node: &NodeId) -> Option<Route> {
        self.routing.lookup(node)
    }

    /// Hands buffered bytes of `route` to the transport.
    pub fn flush(&mut self, route: &Route) {
        self.routing.flush(route);
    }

    /// Writes `hdr` and the optional payload on `route` and flushes it.
    ///
    /// # Errors
    /// Propagates encoding failures; nothing is flushed then.
    pub fn write(
        &mut self,
        route: &Route,
        hdr: &mut Header,
        payload: Option<&dyn PayloadWriter>,
    ) -> Result<()> {
        self.writer
            .write(self.routing.buffer_mut(route.handle), hdr, payload)?;
        self.routing.flush(route);
        Ok(())
    }

    /// Sends an application message to `receiver`.
    ///
    /// Without a sender the message originates from this node with no
    /// actor.
    ///
    /// # Errors
    /// - `LocalReceiver` if `receiver` lives on this node
    /// - `NoRoute` if `receiver.node` is unreachable
    pub fn dispatch(
        &mut self,
        sender: Option<ActorAddr>,
        forwarding_stack: Vec<ActorAddr>,
        receiver: ActorAddr,
        mid: MessageId,
        message: Bytes,
    ) -> Result<()> {
        let this_node = *self.this_node();
        if receiver.node == this_node {
            return Err(NodeError::LocalReceiver {
                node: receiver.node,
            });
        }

        let Some(route) = self.routing.lookup(&receiver.node) else {
            warn!(receiver = %receiver, "No route to receiver, message not sent");
            self.notify(|h| h.message_sending_failed(sender.as_ref(), &receiver, mid, &message));
            return Err(NodeError::NoRoute {
                node: receiver.node,
            });
        };

        let (source_node, source_actor) =
            sender.map_or((this_node, ActorId::INVALID), |s| (s.node, s.actor));
        let mut hdr = Header::new(
            MessageType::DispatchMessage,
            mid.value(),
            source_node,
            receiver.node,
            source_actor,
            receiver.actor,
        );
        let payload = DispatchPayload {
            forwarding_stack,
            message,
        };
        self.write(&route, &mut hdr, Some(&payload))?;

        debug!(
            receiver = %receiver,
            next_hop = %route.next_hop,
            mid = mid.value(),
            "Message dispatched"
        );
        self.notify(|h| {
            h.message_sent(sender.as_ref(), &route.next_hop, &receiver, mid, &payload.message);
        });
        Ok(())
    }

    /// Sends a server handshake on `handle`, announcing the actor
    /// published on `port`.
    ///
    /// # Errors
    /// Propagates encoding failures.
    pub fn write_server_handshake(
        &mut self,
        handle: ConnectionHandle,
        port: Option<u16>,
    ) -> Result<()> {
        let published = port.and_then(|p| self.published.get(p));
        self.writer
            .server_handshake(self.routing.buffer_mut(handle), published)?;
        self.routing.flush_handle(handle);
        Ok(())
    }

    /// Sends a client handshake to `remote` on `handle`.
    ///
    /// # Errors
    /// Propagates encoding failures.
    pub fn write_client_handshake(
        &mut self,
        handle: ConnectionHandle,
        remote: &NodeId,
    ) -> Result<()> {
        self.writer
            .client_handshake(self.routing.buffer_mut(handle), remote)?;
        self.routing.flush_handle(handle);
        Ok(())
    }

    /// Announces to `dest_node` that this node proxies its actor `aid`.
    ///
    /// # Errors
    /// `NoRoute` if `dest_node` is unreachable.
    pub fn write_announce_proxy(&mut self, dest_node: &NodeId, aid: ActorId) -> Result<()> {
        let route = self.route_to(dest_node)?;
        self.writer
            .announce_proxy(self.routing.buffer_mut(route.handle), dest_node, aid)?;
        self.routing.flush(&route);
        Ok(())
    }

    /// Tells `dest_node` that the local actor `aid` terminated.
    ///
    /// # Errors
    /// `NoRoute` if `dest_node` is unreachable.
    pub fn write_kill_proxy(
        &mut self,
        dest_node: &NodeId,
        aid: ActorId,
        reason: ExitReason,
    ) -> Result<()> {
        let route = self.route_to(dest_node)?;
        self.writer
            .kill_proxy(self.routing.buffer_mut(route.handle), dest_node, aid, reason)?;
        self.routing.flush(&route);
        Ok(())
    }

    /// Sends a single heartbeat to `remote`.
    ///
    /// # Errors
    /// `NoRoute` if `remote` is unreachable.
    pub fn write_heartbeat(&mut self, remote: &NodeId) -> Result<()> {
        let route = self.route_to(remote)?;
        self.writer
            .heartbeat(self.routing.buffer_mut(route.handle), remote)?;
        self.routing.flush(&route);
        Ok(())
    }

    fn route_to(&self, node: &NodeId) -> Result<Route> {
        self.routing
            .lookup(node)
            .ok_or(NodeError::NoRoute { node: *node })
    }

    // ========================================
    // Published Actors
    // ========================================

    /// Publishes `actor` on `port`, replacing any previous entry.
    pub fn add_published_actor(
        &mut self,
        port: u16,
        actor: ActorId,
        interface: BTreeSet<String>,
    ) -> Option<PublishedActor> {
        let previous = self.published.add(port, actor, interface);
        self.notify(|h| h.actor_published(actor, port));
        previous
    }

    /// Unpublishes whatever is on `port`; returns the number removed.
    pub fn remove_published_actor<F>(&mut self, port: u16, on_removed: F) -> usize
    where
        F: FnMut(&PublishedActor, u16),
    {
        self.published.remove_with(port, on_removed)
    }

    /// Unpublishes `actor` from `port`, or from every port if `port` is 0.
    pub fn remove_published_actor_for<F>(
        &mut self,
        actor: ActorId,
        port: u16,
        on_removed: F,
    ) -> usize
    where
        F: FnMut(&PublishedActor, u16),
    {
        self.published.remove_actor_with(actor, port, on_removed)
    }

    #[must_use]
    pub const fn published_actors(&self) -> &PublishedActors {
        &self.published
    }

    // ========================================
    // Accessors
    // ========================================

    #[must_use]
    pub const fn routing(&self) -> &RoutingTable<T> {
        &self.routing
    }

    pub fn routing_mut(&mut self) -> &mut RoutingTable<T> {
        &mut self.routing
    }

    #[must_use]
    pub const fn callee(&self) -> &C {
        &self.callee
    }

    pub fn callee_mut(&mut self) -> &mut C {
        &mut self.callee
    }

    fn notify<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn EngineHooks),
    {
        for hook in &mut self.hooks {
            f(hook.as_mut());
        }
    }
}

impl<T, C> std::fmt::Debug for Instance<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("this_node", self.writer.this_node())
            .field("routing", &self.routing)
            .field("published", &self.published.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
