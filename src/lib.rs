//! # Classic Server
//!
//! A server for the legacy "Classic" block-game protocol with:
//! - Fixed-layout binary packet codec (big-endian, space-padded strings)
//! - Gzip level streaming in 1024-byte frames with progress reporting
//! - Per-connection session state machine with cancellable keep-alives
//! - Sequential or thread-per-connection acceptor
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Connection Acceptor                         │
//! │           (Sequential or thread per client)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Session                                 │
//! │   AwaitingHandshake → Transferring → Spawned → Disconnected  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────────┐
//!   │   Packet    │          │ World Serializer │
//!   │   Codec     │◄─────────│ (gzip + frames)  │
//!   └─────────────┘          └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod world;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ClassicError, Result};
pub use config::Config;
pub use network::{DisconnectReason, Server, Session, SessionOutcome, SessionPhase};
pub use world::{Dimensions, WorldGrid, WorldSerializer};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the server crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
