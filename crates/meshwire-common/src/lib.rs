// ============================================
// File: crates/meshwire-common/src/lib.rs
// ============================================
//! # meshwire Common - Shared Identifier Library
//!
//! ## Creation Reason
//! Provides the identifier types and base errors shared across all meshwire
//! crates, so every layer agrees on what a node, actor and connection are.
//!
//! ## Main Functionality
//! - [`types`]: `NodeId`, `ActorId`, `ActorAddr`, `ConnectionHandle`, `MessageId`
//! - [`error`]: Common error type and result alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                meshwire-node                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   meshwire-core  ◄──  meshwire-transport            │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             meshwire-common  ◄── You are here       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::{ActorAddr, ActorId, ConnectionHandle, MessageId, NodeId};
