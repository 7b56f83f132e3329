// ============================================
// File: crates/meshwire-transport/src/channel.rs
// ============================================
//! # Channel Transport
//!
//! ## Creation Reason
//! The engine flushes synchronously while its lock is held, but sockets
//! are written from async tasks. `ChannelTransport` bridges the two with
//! one unbounded tokio channel per connection.
//!
//! ## Main Logical Flow
//! 1. The runner registers a connection and gets the receiving end
//! 2. A writer task drains the receiver into the socket (`write_loop`)
//! 3. `flush` splits the buffered bytes off and sends them as `Bytes`
//! 4. Unregistering drops the sender, which ends the writer task
//!
//! ## Last Modified
//! v0.1.0 - Initial channel transport

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use meshwire_common::types::ConnectionHandle;

use crate::traits::Transport;

/// Transport that hands flushed bytes to per-connection writer tasks.
#[derive(Debug, Default)]
pub struct ChannelTransport {
    outbound: HashMap<ConnectionHandle, mpsc::UnboundedSender<Bytes>>,
}

impl ChannelTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the stream of bytes to write.
    ///
    /// Registering an existing handle replaces its channel.
    pub fn register(&mut self, handle: ConnectionHandle) -> mpsc::UnboundedReceiver<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.outbound.insert(handle, tx).is_some() {
            warn!(handle = %handle, "Replaced outbound channel of registered connection");
        }
        rx
    }

    /// Removes a connection; its writer task ends once queued bytes drain.
    pub fn unregister(&mut self, handle: ConnectionHandle) -> bool {
        self.outbound.remove(&handle).is_some()
    }

    /// Returns `true` if `handle` has a writer attached.
    #[must_use]
    pub fn is_registered(&self, handle: ConnectionHandle) -> bool {
        self.outbound.contains_key(&handle)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outbound.len()
    }

    /// Returns `true` if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }
}

impl Transport for ChannelTransport {
    fn flush(&mut self, handle: ConnectionHandle, buf: &mut BytesMut) {
        if buf.is_empty() {
            return;
        }

        let Some(tx) = self.outbound.get(&handle) else {
            warn!(handle = %handle, dropped = buf.len(), "Flush for unknown connection");
            buf.clear();
            return;
        };

        let bytes = buf.split().freeze();
        trace!(handle = %handle, len = bytes.len(), "Flushing");

        if tx.send(bytes).is_err() {
            debug!(handle = %handle, "Writer task gone, dropping channel");
            self.outbound.remove(&handle);
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_sends_and_drains() {
        let mut transport = ChannelTransport::new();
        let handle = ConnectionHandle::new(1);
        let mut rx = transport.register(handle);

        let mut buf = BytesMut::from(&b"hello"[..]);
        transport.flush(handle, &mut buf);

        assert!(buf.is_empty());
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_empty_flush_sends_nothing() {
        let mut transport = ChannelTransport::new();
        let handle = ConnectionHandle::new(1);
        let mut rx = transport.register(handle);

        transport.flush(handle, &mut BytesMut::new());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_flush_unknown_handle_clears() {
        let mut transport = ChannelTransport::new();
        let mut buf = BytesMut::from(&b"lost"[..]);

        transport.flush(ConnectionHandle::new(9), &mut buf);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_closed_receiver_unregisters() {
        let mut transport = ChannelTransport::new();
        let handle = ConnectionHandle::new(2);
        drop(transport.register(handle));
        assert!(transport.is_registered(handle));

        transport.flush(handle, &mut BytesMut::from(&b"x"[..]));
        assert!(!transport.is_registered(handle));
        assert!(transport.is_empty());
    }

    #[test]
    fn test_unregister() {
        let mut transport = ChannelTransport::new();
        let handle = ConnectionHandle::new(3);
        let _rx = transport.register(handle);
        assert_eq!(transport.len(), 1);

        assert!(transport.unregister(handle));
        assert!(!transport.unregister(handle));
    }
}
