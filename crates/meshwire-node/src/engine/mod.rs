// ============================================
// File: crates/meshwire-node/src/engine/mod.rs
// ============================================
//! # Protocol Engine
//!
//! ## Creation Reason
//! The node-to-node protocol logic, independent of sockets and of the
//! actor runtime it serves.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`instance`]: `Instance`, the receive state machine and routing decisions
//! - [`writer`]: `MessageWriter`, construction of control messages
//! - [`callee`]: `Callee`, the runtime seam for local delivery and purging
//! - [`hooks`]: `EngineHooks`, advisory notifications
//!
//! ## Engine Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Instance                         │
//! │                                                      │
//! │  NewDataMsg ──► state machine ──► Callee             │
//! │                      │                               │
//! │                      ▼                               │
//! │  MessageWriter ──► RoutingTable ──► Transport::flush │
//! │                                                      │
//! │  PublishedActors            EngineHooks (advisory)   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The engine never blocks or spawns; all I/O is the transport's job
//!
//! ## Last Modified
//! v0.1.0 - Initial engine structure

pub mod callee;
pub mod hooks;
pub mod instance;
pub mod writer;


// Re-export primary types
pub use callee::{Callee, LocalMessage, Origin};
pub use hooks::EngineHooks;
pub use instance::Instance;
pub use writer::MessageWriter;
