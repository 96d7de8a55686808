//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! Every packet has a fixed size, so encoding writes into a buffer
//! allocated once at exactly `Packet::wire_size()` bytes and decoding
//! checks the available length against the size table before reading.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ClassicError, Result};
use super::text::{read_string, write_string};
use super::{Packet, PacketId, CHUNK_SIZE, MAX_PACKET_SIZE, STRING_LENGTH};

// =============================================================================
// Encoding
// =============================================================================

/// Encode a packet to bytes
pub fn encode_packet(packet: &Packet) -> Bytes {
    let mut buf = BytesMut::with_capacity(packet.wire_size());
    encode_packet_into(packet, &mut buf);
    buf.freeze()
}

/// Append an encoded packet to `buf`
pub fn encode_packet_into(packet: &Packet, buf: &mut BytesMut) {
    let start = buf.len();
    buf.reserve(packet.wire_size());
    buf.put_u8(packet.id() as u8);

    match packet {
        Packet::ServerIdentification {
            protocol_version,
            server_name,
            motd,
            user_type,
        } => {
            buf.put_u8(*protocol_version);
            write_string(buf, server_name);
            write_string(buf, motd);
            buf.put_u8(*user_type);
        }
        Packet::Ping | Packet::LevelInitialize => {}
        Packet::LevelDataChunk {
            chunk_length,
            chunk_data,
            percent_complete,
        } => {
            buf.put_i16(*chunk_length);
            buf.put_slice(&chunk_data[..]);
            buf.put_u8(*percent_complete);
        }
        Packet::LevelFinalize {
            x_size,
            y_size,
            z_size,
        } => {
            buf.put_i16(*x_size);
            buf.put_i16(*y_size);
            buf.put_i16(*z_size);
        }
        Packet::SpawnPlayer {
            player_id,
            player_name,
            x,
            y,
            z,
            yaw,
            pitch,
        } => {
            buf.put_i8(*player_id);
            write_string(buf, player_name);
            buf.put_i16(*x);
            buf.put_i16(*y);
            buf.put_i16(*z);
            buf.put_u8(*yaw);
            buf.put_u8(*pitch);
        }
        Packet::SetPositionAndOrientation {
            player_id,
            x,
            y,
            z,
            yaw,
            pitch,
        } => {
            buf.put_i8(*player_id);
            buf.put_f32(*x);
            buf.put_f32(*y);
            buf.put_f32(*z);
            buf.put_u8(*yaw);
            buf.put_u8(*pitch);
        }
        Packet::DisconnectPlayer { reason } => {
            write_string(buf, reason);
        }
    }

    debug_assert_eq!(buf.len() - start, packet.wire_size());
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a packet from the front of `bytes`
///
/// Trailing bytes past the packet are ignored.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet> {
    let Some(&id_byte) = bytes.first() else {
        return Err(ClassicError::MalformedPacket(
            "Incomplete header: expected 1 byte, got 0".to_string(),
        ));
    };

    let id = PacketId::from_u8(id_byte).ok_or(ClassicError::UnknownPacket(id_byte))?;
    let size = id.wire_size();

    if bytes.len() < size {
        return Err(ClassicError::MalformedPacket(format!(
            "Incomplete {}: expected {} bytes, got {}",
            id.name(),
            size,
            bytes.len()
        )));
    }

    Ok(decode_body(id, &bytes[1..size]))
}

/// Decode a body whose length has already been checked against the id
fn decode_body(id: PacketId, mut body: &[u8]) -> Packet {
    match id {
        PacketId::ServerIdentification => {
            let protocol_version = body.get_u8();
            let server_name = take_string(&mut body);
            let motd = take_string(&mut body);
            let user_type = body.get_u8();
            Packet::ServerIdentification {
                protocol_version,
                server_name,
                motd,
                user_type,
            }
        }
        PacketId::Ping => Packet::Ping,
        PacketId::LevelInitialize => Packet::LevelInitialize,
        PacketId::LevelDataChunk => {
            let chunk_length = body.get_i16();
            let mut chunk_data = Box::new([0u8; CHUNK_SIZE]);
            body.copy_to_slice(&mut chunk_data[..]);
            let percent_complete = body.get_u8();
            Packet::LevelDataChunk {
                chunk_length,
                chunk_data,
                percent_complete,
            }
        }
        PacketId::LevelFinalize => Packet::LevelFinalize {
            x_size: body.get_i16(),
            y_size: body.get_i16(),
            z_size: body.get_i16(),
        },
        PacketId::SpawnPlayer => {
            let player_id = body.get_i8();
            let player_name = take_string(&mut body);
            Packet::SpawnPlayer {
                player_id,
                player_name,
                x: body.get_i16(),
                y: body.get_i16(),
                z: body.get_i16(),
                yaw: body.get_u8(),
                pitch: body.get_u8(),
            }
        }
        PacketId::SetPositionAndOrientation => Packet::SetPositionAndOrientation {
            player_id: body.get_i8(),
            x: body.get_f32(),
            y: body.get_f32(),
            z: body.get_f32(),
            yaw: body.get_u8(),
            pitch: body.get_u8(),
        },
        PacketId::DisconnectPlayer => Packet::DisconnectPlayer {
            reason: take_string(&mut body),
        },
    }
}

fn take_string(body: &mut &[u8]) -> String {
    let value = read_string(&body[..STRING_LENGTH]);
    body.advance(STRING_LENGTH);
    value
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete packet from a stream
///
/// Blocks until the id byte and the whole body have arrived.
pub fn read_packet<R: Read>(reader: &mut R) -> Result<Packet> {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    reader.read_exact(&mut buf[..1])?;

    let id = PacketId::from_u8(buf[0]).ok_or(ClassicError::UnknownPacket(buf[0]))?;
    let size = id.wire_size();
    if size > 1 {
        reader.read_exact(&mut buf[1..size])?;
    }

    Ok(decode_body(id, &buf[1..size]))
}

/// Write a packet to a stream and flush it
pub fn write_packet<W: Write>(writer: &mut W, packet: &Packet) -> Result<()> {
    let bytes = encode_packet(packet);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
