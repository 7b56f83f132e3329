// ============================================
// File: crates/meshwire-node/src/services/mod.rs
// ============================================
//! # Node Services
//!
//! ## Creation Reason
//! State the protocol engine consults on every message, kept apart from
//! the engine so each can be tested in isolation.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`routing`]: Direct and indirect routes to other nodes
//! - [`registry`]: Actors published on listening ports
//!
//! ## ⚠️ Important Note for Next Developer
//! - Neither service locks; the engine owner serializes access
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod registry;
pub mod routing;

// Re-export primary types
pub use registry::{PublishedActor, PublishedActors, ANY_PORT};
pub use routing::{Route, RoutingTable};
