//! Packet definitions
//!
//! One variant per message kind, each with a statically known wire size.

use crate::error::{ClassicError, Result};
use super::{CHUNK_SIZE, STRING_LENGTH};

/// Packet ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketId {
    ServerIdentification = 0x00,
    Ping = 0x01,
    LevelInitialize = 0x02,
    LevelDataChunk = 0x03,
    LevelFinalize = 0x04,
    SpawnPlayer = 0x07,
    SetPositionAndOrientation = 0x08,
    DisconnectPlayer = 0x0E,
}

impl PacketId {
    /// Look up an id byte
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(PacketId::ServerIdentification),
            0x01 => Some(PacketId::Ping),
            0x02 => Some(PacketId::LevelInitialize),
            0x03 => Some(PacketId::LevelDataChunk),
            0x04 => Some(PacketId::LevelFinalize),
            0x07 => Some(PacketId::SpawnPlayer),
            0x08 => Some(PacketId::SetPositionAndOrientation),
            0x0E => Some(PacketId::DisconnectPlayer),
            _ => None,
        }
    }

    /// Total packet size on the wire, id byte included
    pub const fn wire_size(self) -> usize {
        1 + match self {
            PacketId::ServerIdentification => 1 + STRING_LENGTH + STRING_LENGTH + 1,
            PacketId::Ping => 0,
            PacketId::LevelInitialize => 0,
            PacketId::LevelDataChunk => 2 + CHUNK_SIZE + 1,
            PacketId::LevelFinalize => 2 + 2 + 2,
            PacketId::SpawnPlayer => 1 + STRING_LENGTH + 2 + 2 + 2 + 1 + 1,
            PacketId::SetPositionAndOrientation => 1 + 4 + 4 + 4 + 1 + 1,
            PacketId::DisconnectPlayer => STRING_LENGTH,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketId::ServerIdentification => "ServerIdentification",
            PacketId::Ping => "Ping",
            PacketId::LevelInitialize => "LevelInitialize",
            PacketId::LevelDataChunk => "LevelDataChunk",
            PacketId::LevelFinalize => "LevelFinalize",
            PacketId::SpawnPlayer => "SpawnPlayer",
            PacketId::SetPositionAndOrientation => "SetPositionAndOrientation",
            PacketId::DisconnectPlayer => "DisconnectPlayer",
        }
    }
}

/// A protocol message
///
/// String fields hold at most 64 ASCII characters without trailing spaces;
/// anything else is normalised on encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Server greeting, also used by the client to identify itself
    ServerIdentification {
        protocol_version: u8,
        server_name: String,
        motd: String,
        user_type: u8,
    },

    /// Keep-alive
    Ping,

    /// Start of level data
    LevelInitialize,

    /// One frame of the compressed level
    LevelDataChunk {
        /// Meaningful bytes in `chunk_data`, the rest is zero padding
        chunk_length: i16,
        chunk_data: Box<[u8; CHUNK_SIZE]>,
        percent_complete: u8,
    },

    /// End of level data with the level size
    LevelFinalize { x_size: i16, y_size: i16, z_size: i16 },

    /// Player entering the level; coordinates in 1/32 block units
    SpawnPlayer {
        player_id: i8,
        player_name: String,
        x: i16,
        y: i16,
        z: i16,
        yaw: u8,
        pitch: u8,
    },

    /// Absolute player position in block units
    SetPositionAndOrientation {
        player_id: i8,
        x: f32,
        y: f32,
        z: f32,
        yaw: u8,
        pitch: u8,
    },

    /// Kick with a reason shown to the player
    DisconnectPlayer { reason: String },
}

impl Packet {
    /// Get the packet id
    pub fn id(&self) -> PacketId {
        match self {
            Packet::ServerIdentification { .. } => PacketId::ServerIdentification,
            Packet::Ping => PacketId::Ping,
            Packet::LevelInitialize => PacketId::LevelInitialize,
            Packet::LevelDataChunk { .. } => PacketId::LevelDataChunk,
            Packet::LevelFinalize { .. } => PacketId::LevelFinalize,
            Packet::SpawnPlayer { .. } => PacketId::SpawnPlayer,
            Packet::SetPositionAndOrientation { .. } => PacketId::SetPositionAndOrientation,
            Packet::DisconnectPlayer { .. } => PacketId::DisconnectPlayer,
        }
    }

    /// Encoded size in bytes
    pub fn wire_size(&self) -> usize {
        self.id().wire_size()
    }

    /// Build a level data chunk from up to 1024 payload bytes
    pub fn level_data_chunk(payload: &[u8], percent_complete: u8) -> Result<Self> {
        if payload.len() > CHUNK_SIZE {
            return Err(ClassicError::World(format!(
                "chunk payload of {} bytes exceeds {}",
                payload.len(),
                CHUNK_SIZE
            )));
        }

        let mut chunk_data = Box::new([0u8; CHUNK_SIZE]);
        chunk_data[..payload.len()].copy_from_slice(payload);

        Ok(Packet::LevelDataChunk {
            chunk_length: payload.len() as i16,
            chunk_data,
            percent_complete,
        })
    }

    pub fn disconnect(reason: impl Into<String>) -> Self {
        Packet::DisconnectPlayer {
            reason: reason.into(),
        }
    }
}

/// Convert block units to the 1/32 block fixed-point format, saturating
pub fn to_fixed_point(blocks: f32) -> i16 {
    (blocks * 32.0)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Convert 1/32 block fixed-point back to block units
pub fn from_fixed_point(value: i16) -> f32 {
    f32::from(value) / 32.0
}
