// ============================================
// File: crates/meshwire-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Defines the boundary between the protocol engine and whatever moves
//! bytes: received chunks come in as `NewDataMsg` / `NewDatagramMsg`,
//! outgoing buffers leave through `Transport::flush`.
//!
//! ## Main Functionality
//! - `Transport`: Flush sink for per-connection write buffers
//! - `NewDataMsg`: A stream chunk (header or payload) for one connection
//! - `NewDatagramMsg`: A datagram holding back-to-back records
//!
//! ## Ownership Model
//! ```text
//!   engine writes ──► BytesMut (owned by routing table)
//!                          │
//!                 flush(handle, &mut buf)
//!                          ▼
//!   transport takes what it needs (e.g. buf.split()) and sends it
//! ```
//! After `flush` returns the engine must not assume anything about the
//! buffer's previous contents.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `flush` is synchronous: it is called with the engine lock held,
//!   so implementations hand bytes off (channel, queue) and return
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use bytes::BytesMut;

use meshwire_common::types::ConnectionHandle;

// ============================================
// Transport Trait
// ============================================

/// Sink for outgoing bytes.
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use meshwire_common::types::ConnectionHandle;
/// use meshwire_transport::Transport;
///
/// struct Discard;
///
/// impl Transport for Discard {
///     fn flush(&mut self, _handle: ConnectionHandle, buf: &mut BytesMut) {
///         buf.clear();
///     }
/// }
/// ```
pub trait Transport: Send {
    /// Requests that the bytes buffered for `handle` be sent now.
    ///
    /// Whether and how `buf` is drained is up to the implementation.
    fn flush(&mut self, handle: ConnectionHandle, buf: &mut BytesMut);
}

// ============================================
// Received Data
// ============================================

/// Bytes received on a stream-oriented connection.
///
/// The transport delivers exactly the number of bytes the engine asked
/// for: a full header, or a full payload.
#[derive(Debug, Clone, Copy)]
pub struct NewDataMsg<'a> {
    /// Connection the bytes arrived on.
    pub handle: ConnectionHandle,
    /// Received bytes.
    pub buf: &'a [u8],
}

impl<'a> NewDataMsg<'a> {
    /// Creates a new stream chunk message.
    #[must_use]
    pub const fn new(handle: ConnectionHandle, buf: &'a [u8]) -> Self {
        Self { handle, buf }
    }
}

/// A datagram received on a datagram-oriented endpoint.
///
/// `buf` holds one or more header+payload records back to back.
#[derive(Debug, Clone, Copy)]
pub struct NewDatagramMsg<'a> {
    /// Endpoint handle the datagram arrived on.
    pub handle: ConnectionHandle,
    /// Local port the datagram was received on.
    pub port: u16,
    /// Received bytes.
    pub buf: &'a [u8],
}

impl<'a> NewDatagramMsg<'a> {
    /// Creates a new datagram message.
    #[must_use]
    pub const fn new(handle: ConnectionHandle, port: u16, buf: &'a [u8]) -> Self {
        Self { handle, port, buf }
    }
}
