//! Protocol Module
//!
//! Defines the Classic wire protocol spoken between client and server.
//!
//! ## Packet Format
//! ```text
//! ┌──────────┬──────────────────────────────────────────┐
//! │  Id (1)  │   Fixed-size body, known from the id     │
//! └──────────┴──────────────────────────────────────────┘
//! ```
//!
//! There is no length prefix: a receiver derives the body size from the id.
//! Integers are big-endian, `str64` is a 64-byte ASCII field padded with
//! spaces.
//!
//! ### Packets
//! | Id   | Packet                    | Body                                              |
//! |------|---------------------------|---------------------------------------------------|
//! | 0x00 | ServerIdentification      | u8 version, str64 name, str64 motd, u8 user type  |
//! | 0x01 | Ping                      | -                                                 |
//! | 0x02 | LevelInitialize           | -                                                 |
//! | 0x03 | LevelDataChunk            | i16 length, byte[1024] data, u8 percent           |
//! | 0x04 | LevelFinalize             | i16 x, i16 y, i16 z                               |
//! | 0x07 | SpawnPlayer               | i8 id, str64 name, i16 x/y/z (1/32 block), u8 yaw, u8 pitch |
//! | 0x08 | SetPositionAndOrientation | i8 id, f32 x/y/z, u8 yaw, u8 pitch                |
//! | 0x0E | DisconnectPlayer          | str64 reason                                      |
//!
//! The client opens with its own identification packet. It reuses id 0x00
//! and the ServerIdentification layout: the name field carries the username
//! and the motd field carries the (unchecked) verification key.

mod packet;
mod text;
mod codec;

pub use packet::{from_fixed_point, to_fixed_point, Packet, PacketId};
pub use text::{read_string, write_string};
pub use codec::{decode_packet, encode_packet, encode_packet_into, read_packet, write_packet};

/// Protocol version spoken by this server
pub const PROTOCOL_VERSION: u8 = 0x07;

/// Width of every string field
pub const STRING_LENGTH: usize = 64;

/// Payload size of one LevelDataChunk
pub const CHUNK_SIZE: usize = 1024;

/// Largest packet on the wire (LevelDataChunk)
pub const MAX_PACKET_SIZE: usize = 1 + 2 + CHUNK_SIZE + 1;
