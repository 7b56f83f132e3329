// ============================================
// File: crates/meshwire-core/src/protocol/payload.rs
// ============================================
//! # Payload Codecs
//!
//! ## Creation Reason
//! Control messages carry small structured payloads (application
//! identifier, published interface, exit reason, forwarding stack).
//! This module defines them and their little-endian encoding.
//!
//! ## Main Functionality
//! - `ServerHandshakePayload`, `ClientHandshakePayload`
//! - `KillProxyPayload` with `ExitReason`
//! - `DispatchPayload`: forwarding stack + opaque message bytes
//! - `PayloadReader`: bounds-checked field reader
//!
//! ## Field Encodings
//! | Field | Encoding |
//! |-------|----------|
//! | string | u32 length + UTF-8 bytes |
//! | string set | u32 count + strings (sorted) |
//! | node id | 24 bytes |
//! | actor id | u64 |
//! | blob | u32 length + raw bytes |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Decoders reject trailing bytes; a payload is consumed exactly
//! - Counts read from the wire are never used to preallocate
//!
//! ## Last Modified
//! v0.1.0 - Initial payload codecs

use std::collections::BTreeSet;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use meshwire_common::types::{ActorAddr, ActorId, NodeId, NODE_ID_SIZE};

use crate::error::{CoreError, Result};
use crate::protocol::codec::PayloadWriter;

// ============================================
// Field Writers
// ============================================

fn put_len(sink: &mut BytesMut, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| CoreError::PayloadTooLarge {
        max: u32::MAX as usize,
        actual: len,
    })?;
    sink.put_u32_le(len);
    Ok(())
}

/// Appends a length-prefixed UTF-8 string.
///
/// # Errors
/// Fails if the string is longer than `u32::MAX` bytes.
pub fn put_string(sink: &mut BytesMut, value: &str) -> Result<()> {
    put_len(sink, value.len())?;
    sink.put_slice(value.as_bytes());
    Ok(())
}

/// Appends a count-prefixed set of strings in sorted order.
///
/// # Errors
/// Fails if the set or one of its strings exceeds the length field.
pub fn put_string_set(sink: &mut BytesMut, values: &BTreeSet<String>) -> Result<()> {
    put_len(sink, values.len())?;
    for value in values {
        put_string(sink, value)?;
    }
    Ok(())
}

/// Appends a length-prefixed opaque blob.
///
/// # Errors
/// Fails if the blob is longer than `u32::MAX` bytes.
pub fn put_blob(sink: &mut BytesMut, value: &[u8]) -> Result<()> {
    put_len(sink, value.len())?;
    sink.put_slice(value);
    Ok(())
}

// ============================================
// PayloadReader
// ============================================

/// Bounds-checked reader over a received payload.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    context: &'static str,
}

impl<'a> PayloadReader<'a> {
    /// Creates a reader; `context` names the payload in error messages.
    #[must_use]
    pub const fn new(buf: &'a [u8], context: &'static str) -> Self {
        Self { buf, context }
    }

    /// Number of unread bytes.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.buf.len() < n {
            return Err(CoreError::too_short(n, self.buf.len()));
        }
        Ok(())
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    /// Fails if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    /// Reads a little-endian `u64`.
    ///
    /// # Errors
    /// Fails if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    /// Reads an actor id.
    ///
    /// # Errors
    /// Fails if fewer than 8 bytes remain.
    pub fn read_actor(&mut self) -> Result<ActorId> {
        self.read_u64().map(ActorId::new)
    }

    /// Reads a node id.
    ///
    /// # Errors
    /// Fails if fewer than `NODE_ID_SIZE` bytes remain.
    pub fn read_node(&mut self) -> Result<NodeId> {
        self.need(NODE_ID_SIZE)?;
        let (head, tail) = self.buf.split_at(NODE_ID_SIZE);
        self.buf = tail;
        Ok(NodeId::from_bytes(head)?)
    }

    fn read_slice(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.need(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Fails on truncation or invalid UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        let raw = self.read_slice()?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|e| CoreError::malformed(format!("{}: invalid UTF-8: {}", self.context, e)))
    }

    /// Reads a count-prefixed string set.
    ///
    /// # Errors
    /// Fails on truncation or invalid UTF-8.
    pub fn read_string_set(&mut self) -> Result<BTreeSet<String>> {
        let count = self.read_u32()?;
        let mut set = BTreeSet::new();
        for _ in 0..count {
            set.insert(self.read_string()?);
        }
        Ok(set)
    }

    /// Reads a length-prefixed blob.
    ///
    /// # Errors
    /// Fails on truncation.
    pub fn read_blob(&mut self) -> Result<Bytes> {
        self.read_slice().map(Bytes::copy_from_slice)
    }

    /// Ensures the payload was consumed exactly.
    ///
    /// # Errors
    /// Returns `TrailingData` if unread bytes remain.
    pub fn finish(self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CoreError::TrailingData {
                context: self.context,
                remaining: self.buf.len(),
            })
        }
    }
}

// ============================================
// Handshake Payloads
// ============================================

/// Payload of a server handshake.
///
/// `actor` is `ActorId::INVALID` with an empty interface when nothing is
/// published on the port the peer connected to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerHandshakePayload {
    /// Application identifier; peers with different values refuse each other.
    pub app_identifier: String,
    /// Actor published on the accepting port.
    pub actor: ActorId,
    /// Message signatures that actor accepts.
    pub interface: BTreeSet<String>,
}

impl ServerHandshakePayload {
    /// Decodes the payload.
    ///
    /// # Errors
    /// Fails on truncation, invalid UTF-8 or trailing bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(buf, "server handshake");
        let app_identifier = reader.read_string()?;
        let actor = reader.read_actor()?;
        let interface = reader.read_string_set()?;
        reader.finish()?;
        Ok(Self {
            app_identifier,
            actor,
            interface,
        })
    }
}

impl PayloadWriter for ServerHandshakePayload {
    fn write_payload(&self, sink: &mut BytesMut) -> Result<()> {
        put_string(sink, &self.app_identifier)?;
        sink.put_u64_le(self.actor.value());
        put_string_set(sink, &self.interface)
    }
}

/// Payload of a client handshake.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientHandshakePayload {
    /// Application identifier of the connecting node.
    pub app_identifier: String,
}

impl ClientHandshakePayload {
    /// Decodes the payload.
    ///
    /// # Errors
    /// Fails on truncation, invalid UTF-8 or trailing bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(buf, "client handshake");
        let app_identifier = reader.read_string()?;
        reader.finish()?;
        Ok(Self { app_identifier })
    }
}

impl PayloadWriter for ClientHandshakePayload {
    fn write_payload(&self, sink: &mut BytesMut) -> Result<()> {
        put_string(sink, &self.app_identifier)
    }
}

// ============================================
// Kill Proxy Payload
// ============================================

/// Why an actor terminated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ExitReason {
    /// Numeric reason code; 0 is a normal exit.
    pub code: u32,
    /// Free-form context.
    pub context: String,
}

impl ExitReason {
    /// Code of a normal exit.
    pub const NORMAL: u32 = 0;
    /// Code used when the hosting node went away.
    pub const REMOTE_LINK_UNREACHABLE: u32 = 1;

    /// Creates an exit reason.
    pub fn new(code: u32, context: impl Into<String>) -> Self {
        Self {
            code,
            context: context.into(),
        }
    }

    /// A normal exit without context.
    #[must_use]
    pub fn normal() -> Self {
        Self::new(Self::NORMAL, "")
    }

    /// Returns `true` for a normal exit.
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        self.code == Self::NORMAL
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "exit({})", self.code)
        } else {
            write!(f, "exit({}: {})", self.code, self.context)
        }
    }
}

/// Payload of a kill-proxy message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KillProxyPayload {
    /// Why the actor terminated.
    pub reason: ExitReason,
}

impl KillProxyPayload {
    /// Decodes the payload.
    ///
    /// # Errors
    /// Fails on truncation, invalid UTF-8 or trailing bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(buf, "kill proxy");
        let code = reader.read_u32()?;
        let context = reader.read_string()?;
        reader.finish()?;
        Ok(Self {
            reason: ExitReason { code, context },
        })
    }
}

impl PayloadWriter for KillProxyPayload {
    fn write_payload(&self, sink: &mut BytesMut) -> Result<()> {
        sink.put_u32_le(self.reason.code);
        put_string(sink, &self.reason.context)
    }
}

// ============================================
// Dispatch Payload
// ============================================

/// Payload of a dispatched application message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchPayload {
    /// Actors the message still has to pass through, innermost last.
    pub forwarding_stack: Vec<ActorAddr>,
    /// Opaque serialized message content.
    pub message: Bytes,
}

impl DispatchPayload {
    /// Decodes the payload.
    ///
    /// # Errors
    /// Fails on truncation or trailing bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(buf, "dispatch");
        let count = reader.read_u32()?;
        let mut forwarding_stack = Vec::new();
        for _ in 0..count {
            let node = reader.read_node()?;
            let actor = reader.read_actor()?;
            forwarding_stack.push(ActorAddr::new(node, actor));
        }
        let message = reader.read_blob()?;
        reader.finish()?;
        Ok(Self {
            forwarding_stack,
            message,
        })
    }
}

impl PayloadWriter for DispatchPayload {
    fn write_payload(&self, sink: &mut BytesMut) -> Result<()> {
        put_len(sink, self.forwarding_stack.len())?;
        for hop in &self.forwarding_stack {
            sink.put_slice(&hop.node.to_bytes());
            sink.put_u64_le(hop.actor.value());
        }
        put_blob(sink, &self.message)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(writer: &dyn PayloadWriter) -> BytesMut {
        let mut buf = BytesMut::new();
        writer.write_payload(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_server_handshake_roundtrip() {
        let payload = ServerHandshakePayload {
            app_identifier: "meshwire".into(),
            actor: ActorId::new(42),
            interface: ["ping".to_string(), "add(i32,i32)".to_string()].into_iter().collect(),
        };
        let buf = encode(&payload);
        assert_eq!(ServerHandshakePayload::decode(&buf).unwrap(), payload);
    }

    #[test]
    fn test_string_set_is_sorted_on_wire() {
        let payload = ServerHandshakePayload {
            app_identifier: String::new(),
            actor: ActorId::INVALID,
            interface: ["b".to_string(), "a".to_string()].into_iter().collect(),
        };
        let buf = encode(&payload);
        // app id (4) + actor (8) + count (4) + len (4) => first string at 20
        assert_eq!(buf[20], b'a');
        assert_eq!(buf[25], b'b');
    }

    #[test]
    fn test_client_handshake_trailing_data() {
        let mut buf = encode(&ClientHandshakePayload {
            app_identifier: "x".into(),
        });
        buf.put_u8(0);
        assert!(matches!(
            ClientHandshakePayload::decode(&buf),
            Err(CoreError::TrailingData { remaining: 1, .. })
        ));
    }

    #[test]
    fn test_truncated_string() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(10);
        buf.put_slice(b"abc");
        assert!(matches!(
            ClientHandshakePayload::decode(&buf),
            Err(CoreError::MessageTooShort { expected: 10, actual: 3 })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(2);
        buf.put_slice(&[0xC3, 0x28]);
        assert!(matches!(
            ClientHandshakePayload::decode(&buf),
            Err(CoreError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_kill_proxy_roundtrip() {
        let payload = KillProxyPayload {
            reason: ExitReason::new(ExitReason::REMOTE_LINK_UNREACHABLE, "node down"),
        };
        let buf = encode(&payload);
        let decoded = KillProxyPayload::decode(&buf).unwrap();
        assert_eq!(decoded, payload);
        assert!(!decoded.reason.is_normal());
        assert_eq!(decoded.reason.to_string(), "exit(1: node down)");
        assert!(ExitReason::normal().is_normal());
    }

    #[test]
    fn test_dispatch_roundtrip() {
        let hop = ActorAddr::new(NodeId::new([3u8; 20], 9), ActorId::new(77));
        let payload = DispatchPayload {
            forwarding_stack: vec![hop],
            message: Bytes::from_static(b"hello"),
        };
        let buf = encode(&payload);
        assert_eq!(buf.len(), 4 + NODE_ID_SIZE + 8 + 4 + 5);
        assert_eq!(DispatchPayload::decode(&buf).unwrap(), payload);
    }

    #[test]
    fn test_reader_primitives() {
        let mut buf = BytesMut::new();
        buf.put_u64_le(7);
        let mut reader = PayloadReader::new(&buf, "test");
        assert_eq!(reader.remaining(), 8);
        assert_eq!(reader.read_actor().unwrap(), ActorId::new(7));
        assert!(reader.read_u32().is_err());
        assert!(reader.finish().is_ok());
    }
}
