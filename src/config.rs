//! Configuration for the Classic server
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{ClassicError, Result};
use crate::protocol::{PROTOCOL_VERSION, STRING_LENGTH};
use crate::world::Dimensions;

/// Main configuration for a server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// How accepted connections are scheduled
    pub accept_mode: AcceptMode,

    /// Max concurrent sessions (concurrent mode only)
    pub max_connections: usize,

    /// Handshake read timeout (milliseconds, 0 = wait forever)
    pub handshake_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Protocol version clients must announce
    pub protocol_version: u8,

    /// Name shown on the client loading screen (≤ 64 ASCII bytes)
    pub server_name: String,

    /// Message of the day (≤ 64 ASCII bytes)
    pub motd: String,

    /// User type granted to every player
    pub user_type: UserType,

    /// Id assigned to the connecting player in SpawnPlayer
    pub player_id: i8,

    /// Delay between two Ping packets once the player is spawned
    pub keep_alive_interval: Duration,

    // -------------------------------------------------------------------------
    // World Configuration
    // -------------------------------------------------------------------------
    /// Level size declared in LevelFinalize
    pub world_dimensions: Dimensions,

    /// Block content generator
    pub terrain: Terrain,

    /// Byte layout of the compressed level stream
    pub level_encoding: LevelEncoding,

    /// Gzip level for the level stream (0 = stored, 9 = smallest)
    pub compression_level: u32,

    /// Spawn location; derived from the terrain when unset
    pub spawn: Option<SpawnPoint>,
}

/// Connection scheduling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptMode {
    /// Run each session to completion before accepting the next client
    Sequential,

    /// Run every session on its own thread
    Concurrent,
}

/// Player permission level sent in ServerIdentification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UserType {
    Normal = 0x00,
    Operator = 0x64,
}

/// Terrain generator used to fill the world grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    /// Stone, dirt and a grass top layer up to `ground_height`, air above
    Flat { ground_height: u16 },

    /// All air
    Empty,
}

/// Layout of the level bytes before compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEncoding {
    /// Flattened grid only
    Raw,

    /// Big-endian u32 block count followed by the flattened grid
    LengthPrefixed,
}

/// Where the player appears, in block units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: u8,
    pub pitch: u8,
}

impl SpawnPoint {
    /// Centre of the world, standing on the ground
    pub fn above_ground(dimensions: Dimensions, ground_height: u16) -> Self {
        Self {
            x: f32::from(dimensions.x) / 2.0,
            y: f32::from(ground_height) + 2.0,
            z: f32::from(dimensions.z) / 2.0,
            yaw: 0,
            pitch: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let world_dimensions = Dimensions::new(256, 64, 256);
        Self {
            listen_addr: "127.0.0.1:25565".to_string(),
            accept_mode: AcceptMode::Concurrent,
            max_connections: 64,
            handshake_timeout_ms: 10_000,
            write_timeout_ms: 0,
            protocol_version: PROTOCOL_VERSION,
            server_name: "Classic Server".to_string(),
            motd: "Welcome!".to_string(),
            user_type: UserType::Normal,
            player_id: 1,
            keep_alive_interval: Duration::from_secs(2),
            world_dimensions,
            terrain: Terrain::Flat {
                ground_height: world_dimensions.y / 2,
            },
            level_encoding: LevelEncoding::Raw,
            compression_level: 6,
            spawn: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Height of the topmost solid layer
    pub fn ground_height(&self) -> u16 {
        match self.terrain {
            Terrain::Flat { ground_height } => ground_height,
            Terrain::Empty => 0,
        }
    }

    /// Configured spawn point, or the centre of the world above ground
    pub fn spawn_point(&self) -> SpawnPoint {
        self.spawn_point_in(self.world_dimensions)
    }

    /// Spawn point for a level of the given size
    ///
    /// Used when the level sent differs from `world_dimensions`.
    pub fn spawn_point_in(&self, dimensions: Dimensions) -> SpawnPoint {
        self.spawn.unwrap_or_else(|| {
            SpawnPoint::above_ground(dimensions, self.ground_height().min(dimensions.y))
        })
    }

    /// Check every field a session relies on
    pub fn validate(&self) -> Result<()> {
        self.world_dimensions.validate()?;

        if self.level_encoding == LevelEncoding::LengthPrefixed
            && u32::try_from(self.world_dimensions.volume()).is_err()
        {
            return Err(ClassicError::Config(format!(
                "{} blocks do not fit the u32 level length prefix",
                self.world_dimensions.volume()
            )));
        }

        if self.compression_level > 9 {
            return Err(ClassicError::Config(format!(
                "compression level {} is outside 0..=9",
                self.compression_level
            )));
        }

        if self.keep_alive_interval.is_zero() {
            return Err(ClassicError::Config(
                "keep-alive interval must be non-zero".to_string(),
            ));
        }

        for (field, value) in [("server name", &self.server_name), ("motd", &self.motd)] {
            if !value.is_ascii() || value.len() > STRING_LENGTH {
                return Err(ClassicError::Config(format!(
                    "{} must be at most {} ASCII bytes",
                    field, STRING_LENGTH
                )));
            }
        }

        if self.ground_height() > self.world_dimensions.y {
            return Err(ClassicError::Config(format!(
                "ground height {} exceeds world height {}",
                self.ground_height(),
                self.world_dimensions.y
            )));
        }

        let spawn = self.spawn_point();
        let inside = |v: f32, max: u16| v >= 0.0 && v <= f32::from(max);
        if !(inside(spawn.x, self.world_dimensions.x)
            && inside(spawn.z, self.world_dimensions.z)
            && spawn.y >= 0.0)
        {
            return Err(ClassicError::Config(format!(
                "spawn point ({}, {}, {}) lies outside the world",
                spawn.x, spawn.y, spawn.z
            )));
        }

        if self.accept_mode == AcceptMode::Concurrent && self.max_connections == 0 {
            return Err(ClassicError::Config(
                "max connections must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the connection scheduling strategy
    pub fn accept_mode(mut self, mode: AcceptMode) -> Self {
        self.config.accept_mode = mode;
        self
    }

    /// Set the maximum number of concurrent sessions
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the handshake read timeout (in milliseconds)
    pub fn handshake_timeout_ms(mut self, ms: u64) -> Self {
        self.config.handshake_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the protocol version clients must announce
    pub fn protocol_version(mut self, version: u8) -> Self {
        self.config.protocol_version = version;
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.config.server_name = name.into();
        self
    }

    pub fn motd(mut self, motd: impl Into<String>) -> Self {
        self.config.motd = motd.into();
        self
    }

    pub fn user_type(mut self, user_type: UserType) -> Self {
        self.config.user_type = user_type;
        self
    }

    pub fn player_id(mut self, id: i8) -> Self {
        self.config.player_id = id;
        self
    }

    /// Set the delay between keep-alive pings
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.config.keep_alive_interval = interval;
        self
    }

    /// Set the world size declared to clients
    pub fn world_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.config.world_dimensions = dimensions;
        self
    }

    pub fn terrain(mut self, terrain: Terrain) -> Self {
        self.config.terrain = terrain;
        self
    }

    pub fn level_encoding(mut self, encoding: LevelEncoding) -> Self {
        self.config.level_encoding = encoding;
        self
    }

    /// Set the gzip level (0-9)
    pub fn compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level;
        self
    }

    pub fn spawn(mut self, spawn: SpawnPoint) -> Self {
        self.config.spawn = Some(spawn);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
