//! Error types for the Classic server
//!
//! Provides a unified error type for all operations.

use std::io::ErrorKind;

use thiserror::Error;

/// Result type alias using ClassicError
pub type Result<T> = std::result::Result<T, ClassicError>;

/// Unified error type for Classic server operations
#[derive(Debug, Error)]
pub enum ClassicError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Malformed packet: unknown packet id 0x{0:02x}")]
    UnknownPacket(u8),

    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    ProtocolVersionMismatch { expected: u8, actual: u8 },

    // -------------------------------------------------------------------------
    // World Errors
    // -------------------------------------------------------------------------
    #[error("Compression error: {0}")]
    Compression(String),

    #[error("World error: {0}")]
    World(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClassicError {
    /// True when the error means the peer went away: EOF, reset, abort or
    /// a write into a closed socket.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ClassicError::ConnectionClosed => true,
            ClassicError::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// True for decode failures (short buffer or unknown packet id)
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ClassicError::MalformedPacket(_) | ClassicError::UnknownPacket(_)
        )
    }
}
