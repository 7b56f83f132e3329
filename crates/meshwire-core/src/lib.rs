// ============================================
// File: crates/meshwire-core/src/lib.rs
// ============================================
//! # meshwire Core - Wire Protocol Library
//!
//! ## Creation Reason
//! Provides the binary protocol spoken between meshwire nodes: a fixed
//! 80-byte header, the payloads of control messages and the single write
//! path that frames every outgoing message.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - `MessageType` and `Header` with per-operation validity rules
//! - `HeaderCodec` and `write_message` (placeholder + back-patch)
//! - Handshake, kill-proxy and dispatch payload codecs
//! - `ConnectionState` of a stream receiver
//! - Protocol version management
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                meshwire-node                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   meshwire-core  ◄──  meshwire-transport            │
//! │   You are here               │                      │
//! │         │                    │                      │
//! │         └──────────┬─────────┘                      │
//! │                    ▼                                │
//! │             meshwire-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The crate is pure: no I/O, no locking, no logging on data paths
//! - Protocol changes MUST bump `PROTOCOL_VERSION`
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod protocol;

// Re-export commonly used items
pub use error::{CoreError, Result};
pub use protocol::{
    ConnectionState, Header, MessageType, ProtocolVersion, HEADER_SIZE, PROTOCOL_VERSION,
};
