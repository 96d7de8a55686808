//! World serializer
//!
//! Turns a `WorldGrid` into the ordered `TransferFrame`s sent as
//! LevelDataChunk packets.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::LevelEncoding;
use crate::error::{ClassicError, Result};
use crate::protocol::{Packet, CHUNK_SIZE};
use super::{Dimensions, WorldGrid};

/// One 1024-byte slice of the compressed level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFrame {
    data: Box<[u8; CHUNK_SIZE]>,
    length: usize,
    percent_complete: u8,
}

impl TransferFrame {
    /// Meaningful bytes, without the zero padding
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// Full 1024-byte frame as sent
    pub fn padded(&self) -> &[u8; CHUNK_SIZE] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn percent_complete(&self) -> u8 {
        self.percent_complete
    }

    /// Wrap the frame in a LevelDataChunk packet
    pub fn into_packet(self) -> Packet {
        Packet::LevelDataChunk {
            chunk_length: self.length as i16,
            chunk_data: self.data,
            percent_complete: self.percent_complete,
        }
    }
}

/// A level ready for transfer
#[derive(Debug, Clone)]
pub struct SerializedLevel {
    pub dimensions: Dimensions,
    pub compressed_len: usize,
    pub frames: Vec<TransferFrame>,
}

impl SerializedLevel {
    pub fn finalize_packet(&self) -> Packet {
        self.dimensions.finalize_packet()
    }
}

/// Compresses and frames world grids
#[derive(Debug, Clone, Copy)]
pub struct WorldSerializer {
    encoding: LevelEncoding,
    compression: Compression,
}

impl Default for WorldSerializer {
    fn default() -> Self {
        Self::new(LevelEncoding::Raw)
    }
}

impl WorldSerializer {
    pub fn new(encoding: LevelEncoding) -> Self {
        Self {
            encoding,
            compression: Compression::default(),
        }
    }

    /// Override the gzip level (0-9)
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    /// Compress and split the whole level
    pub fn serialize(&self, grid: &WorldGrid) -> Result<SerializedLevel> {
        let compressed = self.compress(grid)?;
        let frames = split_frames(&compressed);

        tracing::trace!(
            "Serialized {} blocks into {} compressed bytes ({} frames)",
            grid.as_bytes().len(),
            compressed.len(),
            frames.len()
        );

        Ok(SerializedLevel {
            dimensions: grid.dimensions(),
            compressed_len: compressed.len(),
            frames,
        })
    }

    /// Gzip the flattened grid in one shot
    pub fn compress(&self, grid: &WorldGrid) -> Result<Vec<u8>> {
        let blocks = grid.as_bytes();
        let mut encoder = GzEncoder::new(Vec::with_capacity(blocks.len() / 8 + 64), self.compression);

        if self.encoding == LevelEncoding::LengthPrefixed {
            let count = u32::try_from(blocks.len()).map_err(|_| {
                ClassicError::World(format!("{} blocks do not fit a u32 prefix", blocks.len()))
            })?;
            encoder
                .write_all(&count.to_be_bytes())
                .map_err(|e| ClassicError::Compression(e.to_string()))?;
        }

        encoder
            .write_all(blocks)
            .map_err(|e| ClassicError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| ClassicError::Compression(e.to_string()))
    }
}

/// Split a compressed stream into 1024-byte frames, zero-padding the last
///
/// An empty stream yields no frames.
pub fn split_frames(compressed: &[u8]) -> Vec<TransferFrame> {
    let total = compressed.len().div_ceil(CHUNK_SIZE);

    compressed
        .chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(index, chunk)| {
            let mut data = Box::new([0u8; CHUNK_SIZE]);
            data[..chunk.len()].copy_from_slice(chunk);
            TransferFrame {
                data,
                length: chunk.len(),
                percent_complete: percent_complete(index, total),
            }
        })
        .collect()
}

/// Progress after sending frame `index` (0-based) of `total`
pub fn percent_complete(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((index + 1).min(total) * 100 / total) as u8
}
