// ============================================
// File: crates/meshwire-transport/src/lib.rs
// ============================================
//! # meshwire Transport - Network I/O Layer
//!
//! ## Creation Reason
//! Separates byte movement from protocol logic: the engine only sees
//! received chunks and a synchronous `flush` sink, while this crate owns
//! sockets, framing and the hand-off to async writer tasks.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `Transport` flush trait and received-data messages
//! - [`channel`]: `ChannelTransport`, per-connection tokio channels
//! - [`tcp`]: `TcpAcceptor` and outbound `connect`
//! - [`framing`]: `FrameReader` and `write_loop`
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                meshwire-node                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   meshwire-core  ◄──  meshwire-transport            │
//! │                       You are here ◄──              │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             meshwire-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//!   socket ──► FrameReader ──► NewDataMsg ──► engine
//!   engine ──► flush ──► ChannelTransport ──► write_loop ──► socket
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always use traits for testability
//! - Mock implementation available with `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channel;
pub mod error;
pub mod framing;
pub mod tcp;
pub mod traits;

// Mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export primary types
pub use channel::ChannelTransport;
pub use error::{Result, TransportError};
pub use framing::{write_loop, FrameReader};
pub use tcp::{connect, TcpAcceptor};
pub use traits::{NewDataMsg, NewDatagramMsg, Transport};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
