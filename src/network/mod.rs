//! Network Module
//!
//! TCP server and per-client sessions.
//!
//! ## Architecture
//! - Single acceptor loop (non-blocking accept, polled)
//! - Sessions run inline (sequential) or one thread each (concurrent)
//! - Each session owns its socket; nothing is shared between sessions

mod server;
mod session;

pub use server::Server;
pub use session::{DisconnectReason, Player, Session, SessionOutcome, SessionPhase};
