// ============================================
// File: crates/meshwire-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the node-to-node wire protocol: the fixed header, the payloads
//! of control messages and the receive state of a stream connection.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`header`]: `MessageType` and `Header` with validity rules
//! - [`codec`]: Header encoding and the back-patching `write_message`
//! - [`payload`]: Handshake, kill-proxy and dispatch payloads
//! - [`state`]: `ConnectionState` of the stream receiver
//! - [`version`]: Protocol versioning
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Handshake Phase                          │
//! │                                                             │
//! │  Acceptor ───── ServerHandshake (version, app, actor) ────► │
//! │  Acceptor ◄──── ClientHandshake (app) ───────────────────── │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Operational Phase                        │
//! │                                                             │
//! │  Dispatch / AnnounceProxy / KillProxy  (may be relayed)     │
//! │  Heartbeat                             (direct only)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format Principles
//! - Little-endian byte order for multi-byte integers
//! - Fixed-size header, payload length announced up front
//! - No padding or alignment requirements
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod header;
pub mod payload;
pub mod state;
pub mod version;

// Re-export primary types
pub use codec::{decode_header, encode_header, write_message, Codec, HeaderCodec, PayloadWriter};
pub use header::{Header, MessageType, HEADER_SIZE};
pub use payload::{
    ClientHandshakePayload, DispatchPayload, ExitReason, KillProxyPayload, ServerHandshakePayload,
};
pub use state::ConnectionState;
pub use version::{ProtocolVersion, PROTOCOL_VERSION};
