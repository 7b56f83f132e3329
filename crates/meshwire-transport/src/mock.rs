// ============================================
// File: crates/meshwire-transport/src/mock.rs
// ============================================
//! # Mock Transport Implementation
//!
//! ## Creation Reason
//! Provides a transport that records every flush, so engine tests can
//! assert exactly what was emitted on which connection without sockets.
//!
//! ## Usage in Tests
//! ```ignore
//! use bytes::BytesMut;
//! use meshwire_common::types::ConnectionHandle;
//! use meshwire_transport::mock::MockTransport;
//! use meshwire_transport::Transport;
//!
//! let probe = MockTransport::new();
//! let mut transport = probe.clone();
//!
//! transport.flush(ConnectionHandle::new(1), &mut BytesMut::from(&b"abc"[..]));
//! assert_eq!(probe.flush_count(), 1);
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - Clones share the same record, keep one as a probe
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use meshwire_common::types::ConnectionHandle;

use crate::traits::Transport;

/// One recorded `flush` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushRecord {
    /// Connection that was flushed
    pub handle: ConnectionHandle,
    /// Bytes that were pending at flush time
    pub bytes: Bytes,
}

/// Transport that records flushes instead of sending.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    flushed: Arc<Mutex<Vec<FlushRecord>>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `flush` calls so far, including empty ones.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushed.lock().len()
    }

    /// Takes all recorded flushes, leaving the record empty.
    pub fn take_flushed(&self) -> Vec<FlushRecord> {
        std::mem::take(&mut *self.flushed.lock())
    }

    /// Concatenated bytes flushed on `handle`.
    #[must_use]
    pub fn flushed_bytes(&self, handle: ConnectionHandle) -> Vec<u8> {
        self.flushed
            .lock()
            .iter()
            .filter(|r| r.handle == handle)
            .flat_map(|r| r.bytes.iter().copied())
            .collect()
    }
}

impl Transport for MockTransport {
    fn flush(&mut self, handle: ConnectionHandle, buf: &mut BytesMut) {
        let bytes = buf.split().freeze();
        self.flushed.lock().push(FlushRecord { handle, bytes });
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_flushes() {
        let probe = MockTransport::new();
        let mut transport = probe.clone();
        let a = ConnectionHandle::new(1);
        let b = ConnectionHandle::new(2);

        transport.flush(a, &mut BytesMut::from(&b"ab"[..]));
        transport.flush(b, &mut BytesMut::from(&b"x"[..]));
        transport.flush(a, &mut BytesMut::from(&b"c"[..]));

        assert_eq!(probe.flush_count(), 3);
        assert_eq!(probe.flushed_bytes(a), b"abc".to_vec());
        assert_eq!(probe.flushed_bytes(b), b"x".to_vec());
    }

    #[test]
    fn test_take_flushed() {
        let probe = MockTransport::new();
        let mut transport = probe.clone();
        let mut buf = BytesMut::from(&b"data"[..]);

        transport.flush(ConnectionHandle::new(1), &mut buf);

        assert!(buf.is_empty());
        let records = probe.take_flushed();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bytes, Bytes::from_static(b"data"));
        assert_eq!(probe.flush_count(), 0);
    }
}
