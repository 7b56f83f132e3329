// ============================================
// File: crates/meshwire-core/src/protocol/codec.rs
// ============================================
//! # Protocol Codec
//!
//! ## Creation Reason
//! Provides binary serialization of the wire header and the single
//! write path every outgoing message goes through.
//!
//! ## Main Functionality
//! - `Codec` trait: Generic encode/decode interface
//! - `HeaderCodec`: Fixed-size header encoding
//! - `PayloadWriter`: Appends a payload directly into an output buffer
//! - `write_message`: Header placeholder, payload, then back-patched header
//!
//! ## Write Strategy
//! ```text
//!  buf before:  [ ...previous messages... ]
//!  step 1:      [ ... ][ 80 zero bytes ]              reserve placeholder
//!  step 2:      [ ... ][ 80 zero bytes ][ payload ]   writer appends
//!  step 3:      [ ... ][ header(len)   ][ payload ]   encode in place
//! ```
//! The placeholder is tracked by index, so it stays valid when the
//! buffer reallocates while the payload is written.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always validate buffer lengths before reading
//! - A failing payload writer leaves its partial output in the buffer;
//!   the connection is expected to be torn down by the caller
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, Bytes, BytesMut};

use meshwire_common::types::{ActorId, NodeId, HOST_ID_SIZE};

use crate::error::{CoreError, Result};
use crate::protocol::header::{Header, MessageType, HEADER_SIZE};

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding protocol messages.
///
/// # Type Parameters
/// * `T` - The message type to encode/decode
pub trait Codec<T> {
    /// Encodes a message into a byte buffer.
    fn encode(&self, msg: &T, buf: &mut BytesMut);

    /// Decodes a message from bytes.
    ///
    /// # Errors
    /// Returns an error if the bytes do not hold a valid message.
    fn decode(&self, buf: &mut Bytes) -> Result<T>;
}

// ============================================
// HeaderCodec
// ============================================

/// Codec for the fixed-size wire header.
#[derive(Debug, Default, Clone)]
pub struct HeaderCodec;

impl HeaderCodec {
    /// Creates a new header codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the total record length (header + payload) announced by an
    /// encoded header, or `None` if fewer than `HEADER_SIZE` bytes are
    /// available.
    #[must_use]
    pub fn record_len(buf: &[u8]) -> Option<usize> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        let mut len = [0u8; 4];
        len.copy_from_slice(&buf[4..8]);
        Some(HEADER_SIZE + u32::from_le_bytes(len) as usize)
    }
}

impl Codec<Header> for HeaderCodec {
    fn encode(&self, msg: &Header, buf: &mut BytesMut) {
        buf.reserve(HEADER_SIZE);
        put_header(msg, buf);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<Header> {
        read_header(buf)
    }
}

fn put_header<B: BufMut>(hdr: &Header, dst: &mut B) {
    dst.put_u8(hdr.operation.as_byte());
    dst.put_bytes(0, 3);
    dst.put_u32_le(hdr.payload_len);
    dst.put_u64_le(hdr.operation_data);
    dst.put_slice(&hdr.source_node.to_bytes());
    dst.put_slice(&hdr.dest_node.to_bytes());
    dst.put_u64_le(hdr.source_actor.value());
    dst.put_u64_le(hdr.dest_actor.value());
}

fn get_node<B: Buf>(buf: &mut B) -> NodeId {
    let mut host_id = [0u8; HOST_ID_SIZE];
    buf.copy_to_slice(&mut host_id);
    NodeId::new(host_id, buf.get_u32_le())
}

fn read_header<B: Buf>(buf: &mut B) -> Result<Header> {
    if buf.remaining() < HEADER_SIZE {
        return Err(CoreError::too_short(HEADER_SIZE, buf.remaining()));
    }

    let op = buf.get_u8();
    let operation = MessageType::from_byte(op).ok_or(CoreError::UnknownMessageType(op))?;
    buf.advance(3);

    let payload_len = buf.get_u32_le();
    let operation_data = buf.get_u64_le();
    let source_node = get_node(buf);
    let dest_node = get_node(buf);
    let source_actor = ActorId::new(buf.get_u64_le());
    let dest_actor = ActorId::new(buf.get_u64_le());

    Ok(Header {
        operation,
        payload_len,
        operation_data,
        source_node,
        dest_node,
        source_actor,
        dest_actor,
    })
}

/// Overwrites `dst` (exactly `HEADER_SIZE` bytes) with the encoded header.
fn encode_header_into(hdr: &Header, dst: &mut [u8]) {
    debug_assert_eq!(dst.len(), HEADER_SIZE);
    let mut cursor = dst;
    put_header(hdr, &mut cursor);
}

// ============================================
// Message Writing
// ============================================

/// Something that can append a message payload to an output buffer.
pub trait PayloadWriter {
    /// Appends the payload bytes to `sink`.
    ///
    /// # Errors
    /// Returns an error if the payload cannot be encoded.
    fn write_payload(&self, sink: &mut BytesMut) -> Result<()>;
}

impl PayloadWriter for Bytes {
    fn write_payload(&self, sink: &mut BytesMut) -> Result<()> {
        sink.extend_from_slice(self);
        Ok(())
    }
}

/// Appends a complete message (header plus optional payload) to `buf`.
///
/// With a payload writer, a header-sized placeholder is reserved first,
/// the writer appends the payload behind it, and the header is encoded
/// over the placeholder once `payload_len` is known. Without one, the
/// header is appended with `payload_len = 0`. In both cases `hdr` is
/// updated to the length actually written.
///
/// # Errors
/// Propagates writer failures and fails with `PayloadTooLarge` if the
/// payload does not fit in 32 bits. Nothing written so far is rolled back.
pub fn write_message(
    buf: &mut BytesMut,
    hdr: &mut Header,
    payload: Option<&dyn PayloadWriter>,
) -> Result<()> {
    let Some(writer) = payload else {
        hdr.payload_len = 0;
        HeaderCodec.encode(hdr, buf);
        return Ok(());
    };

    let start = buf.len();
    buf.put_bytes(0, HEADER_SIZE);
    writer.write_payload(buf)?;

    let written = buf.len() - start - HEADER_SIZE;
    hdr.payload_len = u32::try_from(written).map_err(|_| CoreError::PayloadTooLarge {
        max: u32::MAX as usize,
        actual: written,
    })?;
    encode_header_into(hdr, &mut buf[start..start + HEADER_SIZE]);
    Ok(())
}

// ============================================
// Convenience Functions
// ============================================

/// Encodes a header to bytes.
#[must_use]
pub fn encode_header(hdr: &Header) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE);
    HeaderCodec.encode(hdr, &mut buf);
    buf
}

/// Decodes a header from the first `HEADER_SIZE` bytes of `buf`.
///
/// # Errors
/// Fails on short input or an unknown operation byte. Structural
/// validity is checked separately by [`Header::validate`].
pub fn decode_header(mut buf: &[u8]) -> Result<Header> {
    read_header(&mut buf)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_header() -> Header {
        Header {
            operation: MessageType::DispatchMessage,
            payload_len: 42,
            operation_data: 0x0102_0304_0506_0708,
            source_node: NodeId::new([0xAA; 20], 17),
            dest_node: NodeId::new([0xBB; 20], 18),
            source_actor: ActorId::new(5),
            dest_actor: ActorId::new(6),
        }
    }

    struct Failing;

    impl PayloadWriter for Failing {
        fn write_payload(&self, sink: &mut BytesMut) -> Result<()> {
            sink.put_u8(1);
            Err(CoreError::encoding("boom"))
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let original = sample_header();
        let encoded = encode_header(&original);
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(decode_header(&encoded).unwrap(), original);

        let mut bytes = encoded.freeze();
        assert_eq!(HeaderCodec.decode(&mut bytes).unwrap(), original);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_header_layout() {
        let encoded = encode_header(&sample_header());

        assert_eq!(encoded[0], MessageType::DispatchMessage.as_byte());
        assert_eq!(&encoded[1..4], &[0, 0, 0]);
        assert_eq!(&encoded[4..8], &42u32.to_le_bytes());
        assert_eq!(&encoded[8..16], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&encoded[16..36], &[0xAA; 20]);
        assert_eq!(&encoded[36..40], &17u32.to_le_bytes());
        assert_eq!(&encoded[40..60], &[0xBB; 20]);
        assert_eq!(&encoded[64..72], &5u64.to_le_bytes());
        assert_eq!(&encoded[72..80], &6u64.to_le_bytes());
    }

    #[test]
    fn test_decode_too_short() {
        let short = [0x02u8; 50];
        assert!(matches!(
            decode_header(&short),
            Err(CoreError::MessageTooShort { expected: HEADER_SIZE, actual: 50 })
        ));
    }

    #[test]
    fn test_decode_unknown_operation() {
        let mut encoded = encode_header(&sample_header());
        encoded[0] = 0x7F;
        assert!(matches!(decode_header(&encoded), Err(CoreError::UnknownMessageType(0x7F))));
    }

    #[test]
    fn test_record_len() {
        let encoded = encode_header(&sample_header());
        assert_eq!(HeaderCodec::record_len(&encoded), Some(HEADER_SIZE + 42));
        assert_eq!(HeaderCodec::record_len(&encoded[..10]), None);
    }

    #[test]
    fn test_write_message_without_payload() {
        let mut buf = BytesMut::new();
        let mut hdr = sample_header();

        write_message(&mut buf, &mut hdr, None).unwrap();

        assert_eq!(hdr.payload_len, 0);
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(decode_header(&buf).unwrap(), hdr);
    }

    #[test]
    fn test_write_message_backpatches_length() {
        let mut buf = BytesMut::from(&b"previous"[..]);
        let mut hdr = sample_header();
        let payload = Bytes::from(vec![9u8; 1000]);

        write_message(&mut buf, &mut hdr, Some(&payload)).unwrap();

        assert_eq!(hdr.payload_len, 1000);
        assert_eq!(&buf[..8], b"previous");
        let decoded = decode_header(&buf[8..]).unwrap();
        assert_eq!(decoded, hdr);
        assert_eq!(&buf[8 + HEADER_SIZE..], &payload[..]);
    }

    #[test]
    fn test_write_message_appends_back_to_back() {
        let mut buf = BytesMut::new();
        let mut first = sample_header();
        let mut second = sample_header();

        write_message(&mut buf, &mut first, Some(&Bytes::from_static(b"abc"))).unwrap();
        write_message(&mut buf, &mut second, None).unwrap();

        assert_eq!(HeaderCodec::record_len(&buf), Some(HEADER_SIZE + 3));
        let rest = &buf[HEADER_SIZE + 3..];
        assert_eq!(decode_header(rest).unwrap().payload_len, 0);
    }

    #[test]
    fn test_write_message_failing_writer() {
        let mut buf = BytesMut::new();
        let mut hdr = sample_header();

        let result = write_message(&mut buf, &mut hdr, Some(&Failing));

        assert!(matches!(result, Err(CoreError::Encoding { .. })));
        // No rollback: placeholder and partial payload stay in the buffer
        assert_eq!(buf.len(), HEADER_SIZE + 1);
    }

    fn arb_node() -> impl Strategy<Value = NodeId> {
        (any::<[u8; 20]>(), any::<u32>()).prop_map(|(host, pid)| NodeId::new(host, pid))
    }

    fn arb_header() -> impl Strategy<Value = Header> {
        (
            0u8..6,
            any::<u32>(),
            any::<u64>(),
            arb_node(),
            arb_node(),
            any::<u64>(),
            any::<u64>(),
        )
            .prop_map(|(op, payload_len, operation_data, src, dst, sa, da)| Header {
                operation: MessageType::from_byte(op).unwrap(),
                payload_len,
                operation_data,
                source_node: src,
                dest_node: dst,
                source_actor: ActorId::new(sa),
                dest_actor: ActorId::new(da),
            })
    }

    proptest! {
        #[test]
        fn prop_header_roundtrip(hdr in arb_header()) {
            let encoded = encode_header(&hdr);
            prop_assert_eq!(encoded.len(), HEADER_SIZE);
            prop_assert_eq!(decode_header(&encoded).unwrap(), hdr);
        }
    }
}
