// ============================================
// File: crates/meshwire-core/src/protocol/state.rs
// ============================================
//! # Receive State
//!
//! Per-connection state of a stream receiver: waiting for a header,
//! waiting for the payload announced by that header, or finished.

use crate::protocol::header::{Header, HEADER_SIZE};

/// Receive state of a stream-oriented connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// The next chunk is a `HEADER_SIZE` header.
    #[default]
    AwaitHeader,
    /// The next chunk is exactly `payload_len` payload bytes.
    AwaitPayload,
    /// Terminal: the connection must be torn down.
    CloseConnection,
}

impl ConnectionState {
    /// Number of bytes the transport must deliver next, or `None` once
    /// the connection is closed.
    #[must_use]
    pub fn next_read_len(&self, hdr: &Header) -> Option<usize> {
        match self {
            Self::AwaitHeader => Some(HEADER_SIZE),
            Self::AwaitPayload => Some(hdr.payload_len as usize),
            Self::CloseConnection => None,
        }
    }

    /// Returns `true` for the terminal state.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::CloseConnection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_read_len() {
        let mut hdr = Header::default();
        hdr.payload_len = 12;

        assert_eq!(ConnectionState::AwaitHeader.next_read_len(&hdr), Some(HEADER_SIZE));
        assert_eq!(ConnectionState::AwaitPayload.next_read_len(&hdr), Some(12));
        assert_eq!(ConnectionState::CloseConnection.next_read_len(&hdr), None);
        assert!(ConnectionState::CloseConnection.is_closed());
        assert_eq!(ConnectionState::default(), ConnectionState::AwaitHeader);
    }
}
