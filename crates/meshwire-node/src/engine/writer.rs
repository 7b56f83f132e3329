// ============================================
// File: crates/meshwire-node/src/engine/writer.rs
// ============================================
//! # Message Writer
//!
//! ## Creation Reason
//! Builds the headers and payloads of every control message this node
//! emits, so the engine only decides *when* to send and *where*.
//!
//! ## Main Functionality
//! - Server / client handshake
//! - Announce-proxy / kill-proxy
//! - Heartbeat
//! - `write`: arbitrary header plus optional payload
//!
//! ## ⚠️ Important Note for Next Developer
//! - Failed writes are logged here and returned; a partially written
//!   message is left in the buffer
//!
//! ## Last Modified
//! v0.1.0 - Initial message writer

use bytes::BytesMut;
use tracing::{error, trace};

use meshwire_common::types::{ActorId, NodeId};
use meshwire_core::protocol::{
    write_message, ClientHandshakePayload, ExitReason, Header, KillProxyPayload, MessageType,
    PayloadWriter, ServerHandshakePayload, PROTOCOL_VERSION,
};

use crate::error::Result;
use crate::services::PublishedActor;

/// Encodes messages originating at `this_node`.
#[derive(Debug, Clone)]
pub struct MessageWriter {
    this_node: NodeId,
    app_identifier: String,
}

impl MessageWriter {
    pub fn new(this_node: NodeId, app_identifier: impl Into<String>) -> Self {
        Self {
            this_node,
            app_identifier: app_identifier.into(),
        }
    }

    #[must_use]
    pub const fn this_node(&self) -> &NodeId {
        &self.this_node
    }

    #[must_use]
    pub fn app_identifier(&self) -> &str {
        &self.app_identifier
    }

    /// Appends `hdr` and the optional payload to `buf`.
    ///
    /// # Errors
    /// Returns the encoding error after logging it.
    pub fn write(
        &self,
        buf: &mut BytesMut,
        hdr: &mut Header,
        payload: Option<&dyn PayloadWriter>,
    ) -> Result<()> {
        match write_message(buf, hdr, payload) {
            Ok(()) => {
                trace!(
                    operation = ?hdr.operation,
                    dest = %hdr.dest_node,
                    payload_len = hdr.payload_len,
                    "Message written"
                );
                Ok(())
            }
            Err(e) => {
                error!(operation = ?hdr.operation, error = %e, "Failed to encode message");
                Err(e.into())
            }
        }
    }

    /// Server handshake announcing the actor published on the accepting
    /// port, if any.
    ///
    /// # Errors
    /// Propagates encoding failures.
    pub fn server_handshake(
        &self,
        buf: &mut BytesMut,
        published: Option<&PublishedActor>,
    ) -> Result<()> {
        let payload = ServerHandshakePayload {
            app_identifier: self.app_identifier.clone(),
            actor: published.map_or(ActorId::INVALID, |p| p.actor),
            interface: published.map(|p| p.interface.clone()).unwrap_or_default(),
        };
        let mut hdr = Header::new(
            MessageType::ServerHandshake,
            PROTOCOL_VERSION,
            self.this_node,
            NodeId::NONE,
            payload.actor,
            ActorId::INVALID,
        );
        self.write(buf, &mut hdr, Some(&payload))
    }

    /// Client handshake addressed to `remote`.
    ///
    /// # Errors
    /// Propagates encoding failures.
    pub fn client_handshake(&self, buf: &mut BytesMut, remote: &NodeId) -> Result<()> {
        let payload = ClientHandshakePayload {
            app_identifier: self.app_identifier.clone(),
        };
        let mut hdr = Header::new(
            MessageType::ClientHandshake,
            0,
            self.this_node,
            *remote,
            ActorId::INVALID,
            ActorId::INVALID,
        );
        self.write(buf, &mut hdr, Some(&payload))
    }

    /// Tells `dest_node` that this node now holds a proxy for its actor
    /// `aid`.
    ///
    /// # Errors
    /// Propagates encoding failures.
    pub fn announce_proxy(
        &self,
        buf: &mut BytesMut,
        dest_node: &NodeId,
        aid: ActorId,
    ) -> Result<()> {
        let mut hdr = Header::new(
            MessageType::AnnounceProxy,
            0,
            self.this_node,
            *dest_node,
            ActorId::INVALID,
            aid,
        );
        self.write(buf, &mut hdr, None)
    }

    /// Tells `dest_node` that the local actor `aid` terminated.
    ///
    /// # Errors
    /// Propagates encoding failures.
    pub fn kill_proxy(
        &self,
        buf: &mut BytesMut,
        dest_node: &NodeId,
        aid: ActorId,
        reason: ExitReason,
    ) -> Result<()> {
        let payload = KillProxyPayload { reason };
        let mut hdr = Header::new(
            MessageType::KillProxy,
            0,
            self.this_node,
            *dest_node,
            aid,
            ActorId::INVALID,
        );
        self.write(buf, &mut hdr, Some(&payload))
    }

    /// # Errors
    /// Propagates encoding failures.
    pub fn heartbeat(&self, buf: &mut BytesMut, remote: &NodeId) -> Result<()> {
        let mut hdr = Header::new(
            MessageType::Heartbeat,
            0,
            self.this_node,
            *remote,
            ActorId::INVALID,
            ActorId::INVALID,
        );
        self.write(buf, &mut hdr, None)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use meshwire_core::protocol::{decode_header, HEADER_SIZE};

    use super::*;

    fn writer() -> MessageWriter {
        MessageWriter::new(NodeId::new([1; 20], 1), "test-app")
    }

    fn split(buf: &[u8]) -> (Header, &[u8]) {
        let hdr = decode_header(&buf[..HEADER_SIZE]).unwrap();
        (hdr, &buf[HEADER_SIZE..])
    }

    #[test]
    fn test_server_handshake_without_published_actor() {
        let mut buf = BytesMut::new();
        writer().server_handshake(&mut buf, None).unwrap();

        let (hdr, payload) = split(&buf);
        assert_eq!(hdr.operation, MessageType::ServerHandshake);
        assert_eq!(hdr.operation_data, PROTOCOL_VERSION);
        assert!(hdr.is_valid());

        let decoded = ServerHandshakePayload::decode(payload).unwrap();
        assert_eq!(decoded.app_identifier, "test-app");
        assert_eq!(decoded.actor, ActorId::INVALID);
        assert!(decoded.interface.is_empty());
    }

    #[test]
    fn test_server_handshake_with_published_actor() {
        let published = PublishedActor {
            actor: ActorId::new(42),
            interface: BTreeSet::from(["ping".to_string(), "pong".to_string()]),
        };
        let mut buf = BytesMut::new();
        writer().server_handshake(&mut buf, Some(&published)).unwrap();

        let (hdr, payload) = split(&buf);
        assert_eq!(hdr.source_actor, ActorId::new(42));
        assert_eq!(hdr.dest_actor, ActorId::INVALID);
        let decoded = ServerHandshakePayload::decode(payload).unwrap();
        assert_eq!(decoded.actor, ActorId::new(42));
        assert_eq!(decoded.interface, published.interface);
    }

    #[test]
    fn test_control_messages_are_valid() {
        let w = writer();
        let remote = NodeId::new([2; 20], 2);
        let mut buf = BytesMut::new();

        w.client_handshake(&mut buf, &remote).unwrap();
        let (hdr, payload) = split(&buf);
        assert!(hdr.is_valid());
        assert_eq!(hdr.payload_len as usize, payload.len());
        assert_eq!(ClientHandshakePayload::decode(payload).unwrap().app_identifier, "test-app");

        for op in 0..3 {
            let mut buf = BytesMut::new();
            match op {
                0 => w.announce_proxy(&mut buf, &remote, ActorId::new(5)).unwrap(),
                1 => w
                    .kill_proxy(&mut buf, &remote, ActorId::new(5), ExitReason::normal())
                    .unwrap(),
                _ => w.heartbeat(&mut buf, &remote).unwrap(),
            }
            let (hdr, payload) = split(&buf);
            assert!(hdr.is_valid(), "{:?}", hdr.validate());
            assert_eq!(hdr.payload_len as usize, payload.len());
            assert_eq!(hdr.dest_node, remote);
        }
    }
}
