// ============================================
// File: crates/meshwire-node/src/handlers/mod.rs
// ============================================
//! # Message Handlers
//!
//! ## Creation Reason
//! Processing of messages the engine delivers to this node.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`local`]: `LocalRuntime`, the callee used by the node binary
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers structure

pub mod local;

pub use local::{LocalRuntime, PeerInfo};
