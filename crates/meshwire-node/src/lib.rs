// ============================================
// File: crates/meshwire-node/src/lib.rs
// ============================================
//! # meshwire Node Library
//!
//! ## Creation Reason
//! Provides the node-to-node protocol engine of the meshwire actor mesh
//! together with the services it depends on and a tokio runner that turns
//! it into a working node.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`engine`]: Protocol engine (`Instance`), message writer, callee and hooks
//! - [`services`]: Routing table and published-actor registry
//! - [`handlers`]: `LocalRuntime`, the callee used by the binary
//! - [`server`]: `Node`, sockets and tasks around the engine
//! - [`config`]: Node configuration management
//! - [`error`]: Node-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        meshwire Node                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐  │
//! │  │   Config    │────►│    Node     │────►│  LocalRuntime   │  │
//! │  │             │     │   Runner    │     │    (Callee)     │  │
//! │  └─────────────┘     └──────┬──────┘     └────────▲────────┘  │
//! │                             │                     │           │
//! │                             ▼                     │           │
//! │                      ┌─────────────┐              │           │
//! │                      │  Instance   │──────────────┘           │
//! │                      │  (engine)   │                          │
//! │                      └──────┬──────┘                          │
//! │              ┌──────────────┴──────────────┐                  │
//! │              ▼                             ▼                  │
//! │      ┌──────────────┐             ┌─────────────────┐         │
//! │      │ RoutingTable │             │ PublishedActors │         │
//! │      └──────────────┘             └─────────────────┘         │
//! ├───────────────────────────────────────────────────────────────┤
//! │                     Transport Layer                           │
//! │        TcpAcceptor / FrameReader / ChannelTransport           │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The engine is synchronous and unsynchronized; only the runner locks
//! - Configuration changes require restart (no hot-reload)
//!
//! ## Last Modified
//! v0.1.0 - Initial node library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod server;
pub mod services;

// Re-export primary types
pub use config::NodeConfig;
pub use engine::{Callee, EngineHooks, Instance};
pub use error::{NodeError, Result};
pub use server::{Node, NodeEngine};
