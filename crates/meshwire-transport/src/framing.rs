// ============================================
// File: crates/meshwire-transport/src/framing.rs
// ============================================
//! # Stream Framing
//!
//! ## Creation Reason
//! The engine's receive state machine tells the transport how many bytes
//! it needs next (a header, or exactly one payload). `FrameReader` reads
//! exactly that much from an async stream; `write_loop` drains flushed
//! buffers into the socket.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Chunk sizes come from the peer; `max_frame_len` bounds allocation
//! - EOF (clean or mid-chunk) is reported as `Ok(None)`
//!
//! ## Last Modified
//! v0.1.0 - Initial framing helpers

use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Result, TransportError};

// ============================================
// FrameReader
// ============================================

/// Reads exact-size chunks from an async byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a reader; chunks above `max_frame_len` are refused.
    pub const fn new(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner,
            max_frame_len,
        }
    }

    /// Reads exactly `len` bytes.
    ///
    /// Returns `Ok(None)` if the peer closed the stream.
    ///
    /// # Errors
    /// `FrameTooLarge` above the limit, `ReceiveFailed` on I/O errors.
    pub async fn read_chunk(&mut self, len: usize) -> Result<Option<BytesMut>> {
        if len > self.max_frame_len {
            return Err(TransportError::FrameTooLarge {
                max: self.max_frame_len,
                requested: len,
            });
        }

        let mut buf = BytesMut::zeroed(len);
        match self.inner.read_exact(&mut buf).await {
            Ok(_) => {
                trace!(len, "Read chunk");
                Ok(Some(buf))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(TransportError::ReceiveFailed {
                reason: e.to_string(),
            }),
        }
    }
}

// ============================================
// Writer Task
// ============================================

/// Writes every buffer received on `rx` to `writer` until the channel
/// closes, then shuts the writer down.
///
/// # Errors
/// Returns `SendFailed` if a write fails.
pub async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Bytes>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = rx.recv().await {
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })?;
        trace!(len = bytes.len(), "Wrote buffer");
    }

    // Peer may already be gone
    let _ = writer.shutdown().await;
    Ok(())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_exact_chunks() {
        let data: &[u8] = b"headerpayload";
        let mut reader = FrameReader::new(data, 64);

        assert_eq!(&reader.read_chunk(6).await.unwrap().unwrap()[..], b"header");
        assert_eq!(&reader.read_chunk(7).await.unwrap().unwrap()[..], b"payload");
        assert!(reader.read_chunk(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_chunk_is_eof() {
        let data: &[u8] = b"abc";
        let mut reader = FrameReader::new(data, 64);
        assert!(reader.read_chunk(10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_too_large() {
        let data: &[u8] = b"";
        let mut reader = FrameReader::new(data, 4);
        assert!(matches!(
            reader.read_chunk(5).await,
            Err(TransportError::FrameTooLarge { max: 4, requested: 5 })
        ));
    }

    #[tokio::test]
    async fn test_write_loop_drains_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Bytes::from_static(b"one")).unwrap();
        tx.send(Bytes::from_static(b"two")).unwrap();
        drop(tx);

        let mut out = Vec::new();
        write_loop(&mut out, rx).await.unwrap();
        assert_eq!(out, b"onetwo");
    }
}
