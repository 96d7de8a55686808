//! World grid
//!
//! A dense 3D array of block codes stored already flattened in wire order:
//! X outermost, then Y, then Z, i.e. `index = (x * y_size + y) * z_size + z`.

use crate::config::Terrain;
use crate::error::{ClassicError, Result};
use crate::protocol::Packet;

/// Block codes used by the built-in terrain
pub mod block {
    pub const AIR: u8 = 0;
    pub const STONE: u8 = 1;
    pub const GRASS: u8 = 2;
    pub const DIRT: u8 = 3;
}

/// Layers of dirt between stone and the grass top
const DIRT_DEPTH: u16 = 3;

/// Largest level held in memory (1024 x 256 x 1024 blocks)
pub const MAX_VOLUME: u64 = 1 << 28;

/// Level size in blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl Dimensions {
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    /// Number of blocks
    pub fn volume(&self) -> usize {
        usize::from(self.x) * usize::from(self.y) * usize::from(self.z)
    }

    /// Every axis must fit the i16 fields of LevelFinalize and the whole
    /// level must stay within `MAX_VOLUME` blocks
    pub fn validate(&self) -> Result<()> {
        let limit = i16::MAX as u16;
        if self.x > limit || self.y > limit || self.z > limit {
            return Err(ClassicError::World(format!(
                "dimensions {}x{}x{} exceed {} on some axis",
                self.x, self.y, self.z, limit
            )));
        }

        let volume = u64::from(self.x) * u64::from(self.y) * u64::from(self.z);
        if volume > MAX_VOLUME {
            return Err(ClassicError::World(format!(
                "dimensions {}x{}x{} hold {} blocks, limit is {}",
                self.x, self.y, self.z, volume, MAX_VOLUME
            )));
        }
        Ok(())
    }

    /// LevelFinalize packet declaring these dimensions
    pub fn finalize_packet(&self) -> Packet {
        Packet::LevelFinalize {
            x_size: self.x as i16,
            y_size: self.y as i16,
            z_size: self.z as i16,
        }
    }
}

/// Block content of a level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldGrid {
    dimensions: Dimensions,
    blocks: Vec<u8>,
}

impl WorldGrid {
    /// Wrap already flattened blocks
    pub fn from_blocks(dimensions: Dimensions, blocks: Vec<u8>) -> Result<Self> {
        dimensions.validate()?;
        if blocks.len() != dimensions.volume() {
            return Err(ClassicError::World(format!(
                "expected {} blocks for {}x{}x{}, got {}",
                dimensions.volume(),
                dimensions.x,
                dimensions.y,
                dimensions.z,
                blocks.len()
            )));
        }
        Ok(Self { dimensions, blocks })
    }

    /// All-air level
    pub fn empty(dimensions: Dimensions) -> Result<Self> {
        dimensions.validate()?;
        Self::from_blocks(dimensions, vec![block::AIR; dimensions.volume()])
    }

    /// Flat level: stone, three dirt layers, grass on top at
    /// `ground_height - 1`, air above
    pub fn flat(dimensions: Dimensions, ground_height: u16) -> Result<Self> {
        dimensions.validate()?;

        // one x-slice (all y, all z) repeated along x
        let mut slice = Vec::with_capacity(usize::from(dimensions.y) * usize::from(dimensions.z));
        for y in 0..dimensions.y {
            let code = layer_block(y, ground_height);
            slice.extend(std::iter::repeat(code).take(usize::from(dimensions.z)));
        }

        let mut blocks = Vec::with_capacity(dimensions.volume());
        for _ in 0..dimensions.x {
            blocks.extend_from_slice(&slice);
        }

        Self::from_blocks(dimensions, blocks)
    }

    /// Build the grid for a terrain setting
    pub fn generate(dimensions: Dimensions, terrain: Terrain) -> Result<Self> {
        match terrain {
            Terrain::Flat { ground_height } => Self::flat(dimensions, ground_height),
            Terrain::Empty => Self::empty(dimensions),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Flattened blocks in wire order
    pub fn as_bytes(&self) -> &[u8] {
        &self.blocks
    }

    pub fn get(&self, x: u16, y: u16, z: u16) -> Option<u8> {
        self.index(x, y, z).map(|i| self.blocks[i])
    }

    /// Set one block, returning false when the position is outside the grid
    pub fn set(&mut self, x: u16, y: u16, z: u16, code: u8) -> bool {
        match self.index(x, y, z) {
            Some(i) => {
                self.blocks[i] = code;
                true
            }
            None => false,
        }
    }

    fn index(&self, x: u16, y: u16, z: u16) -> Option<usize> {
        let d = self.dimensions;
        if x >= d.x || y >= d.y || z >= d.z {
            return None;
        }
        Some((usize::from(x) * usize::from(d.y) + usize::from(y)) * usize::from(d.z) + usize::from(z))
    }
}

fn layer_block(y: u16, ground_height: u16) -> u8 {
    if y >= ground_height {
        block::AIR
    } else if y + 1 == ground_height {
        block::GRASS
    } else if y + 1 + DIRT_DEPTH >= ground_height {
        block::DIRT
    } else {
        block::STONE
    }
}
