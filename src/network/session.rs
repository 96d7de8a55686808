//! Session
//!
//! Drives one client connection through the protocol:
//!
//! ```text
//!   AwaitingHandshake ──(version ok)──► Transferring ──(finalize sent)──► Spawned
//!          │                                 │                              │
//!          └──(mismatch / error)─────────────┴──(closed / error)────────────┴──► Disconnected
//! ```
//!
//! A session owns its socket exclusively. Every failure is terminal: the
//! socket is shut down and `run` reports why and in which phase, no error
//! leaves the session.

use std::io::{BufReader, BufWriter, ErrorKind, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use crate::config::Config;
use crate::error::{ClassicError, Result};
use crate::protocol::{read_packet, to_fixed_point, write_packet, Packet};
use crate::world::{Dimensions, WorldGrid, WorldSerializer};

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingHandshake,
    Transferring,
    Spawned,
    Disconnected,
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client closed or reset the connection
    PeerClosed,

    /// The client announced another protocol version and was kicked
    VersionMismatch { expected: u8, actual: u8 },

    /// The client sent bytes that are not a valid packet
    Malformed(String),

    /// Any other socket or server-side failure
    Io(String),

    /// The server is shutting down
    Shutdown,
}

/// Identity captured from the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: i8,
    pub name: String,
}

/// What `Session::run` reports once the connection is gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub reason: DisconnectReason,

    /// Phase the session was in when it ended
    pub phase: SessionPhase,

    /// Set once the handshake was accepted
    pub player: Option<Player>,
}

enum Handshake {
    Accepted(Player),
    Rejected(DisconnectReason),
}

/// Handles a single client connection
pub struct Session {
    /// TCP stream reader (used for the handshake only)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    config: Arc<Config>,

    /// Level to send; generated from the config when unset
    world: Option<WorldGrid>,

    /// Disconnects when the server shuts down
    shutdown: Receiver<()>,

    /// Drains inbound bytes once spawned to notice the peer closing
    watcher: Option<JoinHandle<()>>,

    phase: SessionPhase,
    player: Option<Player>,

    /// Peer address for logging
    peer_addr: String,
}

impl Session {
    /// Create a session for an accepted socket
    pub fn new(stream: TcpStream, config: Arc<Config>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm so pings go out immediately
        stream.set_nodelay(true)?;

        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            config,
            world: None,
            shutdown: channel::never(),
            watcher: None,
            phase: SessionPhase::AwaitingHandshake,
            player: None,
            peer_addr,
        })
    }

    /// Send this level instead of generating one
    pub fn with_world(mut self, world: WorldGrid) -> Self {
        self.world = Some(world);
        self
    }

    /// End the session once `shutdown` fires or its sender is dropped
    pub fn with_shutdown(mut self, shutdown: Receiver<()>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Run the session to completion (blocking)
    ///
    /// Returns when the client disconnects, fails the handshake, sends
    /// garbage, the socket errors or the server shuts down.
    pub fn run(mut self) -> SessionOutcome {
        tracing::debug!("Session started for {}", self.peer_addr);

        let reason = match self.drive() {
            Ok(reason) => reason,
            Err(e) if e.is_disconnect() => {
                tracing::debug!("Client {} disconnected during {:?}", self.peer_addr, self.phase);
                DisconnectReason::PeerClosed
            }
            Err(e) if e.is_malformed() => {
                tracing::warn!("Dropping {}: {}", self.peer_addr, e);
                DisconnectReason::Malformed(e.to_string())
            }
            Err(e) => {
                tracing::warn!("Error on session {} during {:?}: {}", self.peer_addr, self.phase, e);
                DisconnectReason::Io(e.to_string())
            }
        };

        let phase = self.phase;
        self.close();
        tracing::info!("Session {} ended during {:?}: {:?}", self.peer_addr, phase, reason);

        SessionOutcome {
            reason,
            phase,
            player: self.player.take(),
        }
    }

    fn drive(&mut self) -> Result<DisconnectReason> {
        let player = match self.await_handshake()? {
            Handshake::Accepted(player) => player,
            Handshake::Rejected(reason) => return Ok(reason),
        };

        self.player = Some(player.clone());

        let dimensions = self.transfer_world()?;
        self.spawn(&player, dimensions)?;
        self.keep_alive()
    }

    // =========================================================================
    // AwaitingHandshake
    // =========================================================================

    fn await_handshake(&mut self) -> Result<Handshake> {
        let stream = self.reader.get_ref();
        if self.config.handshake_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(self.config.handshake_timeout_ms)))?;
        }

        let packet = read_packet(&mut self.reader)?;
        self.reader.get_ref().set_read_timeout(None)?;

        let (actual, username) = match packet {
            Packet::ServerIdentification {
                protocol_version,
                server_name,
                ..
            } => (protocol_version, server_name),
            other => {
                return Err(ClassicError::MalformedPacket(format!(
                    "expected identification, got {}",
                    other.id().name()
                )))
            }
        };

        let expected = self.config.protocol_version;
        if actual != expected {
            tracing::info!(
                "Rejecting {} ({}): protocol version {} != {}",
                self.peer_addr,
                username,
                actual,
                expected
            );
            self.send(&Packet::disconnect(format!(
                "Unsupported protocol version {} (server speaks {})",
                actual, expected
            )))?;
            return Ok(Handshake::Rejected(DisconnectReason::VersionMismatch { expected, actual }));
        }

        tracing::info!("Player {} joined from {}", username, self.peer_addr);
        Ok(Handshake::Accepted(Player {
            id: self.config.player_id,
            name: username,
        }))
    }

    // =========================================================================
    // Transferring
    // =========================================================================

    /// Send the level and return the dimensions it declared
    fn transfer_world(&mut self) -> Result<Dimensions> {
        self.phase = SessionPhase::Transferring;

        let world = match self.world.take() {
            Some(world) => world,
            None => WorldGrid::generate(self.config.world_dimensions, self.config.terrain)?,
        };
        let level = WorldSerializer::new(self.config.level_encoding)
            .with_compression_level(self.config.compression_level)
            .serialize(&world)?;
        drop(world);

        self.send(&Packet::ServerIdentification {
            protocol_version: self.config.protocol_version,
            server_name: self.config.server_name.clone(),
            motd: self.config.motd.clone(),
            user_type: self.config.user_type as u8,
        })?;
        self.send(&Packet::LevelInitialize)?;

        let frame_count = level.frames.len();
        let finalize = level.finalize_packet();
        for frame in level.frames {
            self.send(&frame.into_packet())?;
        }
        self.send(&finalize)?;

        tracing::debug!(
            "Sent level to {}: {} compressed bytes in {} frames",
            self.peer_addr,
            level.compressed_len,
            frame_count
        );

        self.phase = SessionPhase::Spawned;
        Ok(level.dimensions)
    }

    // =========================================================================
    // Spawned
    // =========================================================================

    fn spawn(&mut self, player: &Player, dimensions: Dimensions) -> Result<()> {
        let spawn = self.config.spawn_point_in(dimensions);

        self.send(&Packet::SpawnPlayer {
            player_id: player.id,
            player_name: player.name.clone(),
            x: to_fixed_point(spawn.x),
            y: to_fixed_point(spawn.y),
            z: to_fixed_point(spawn.z),
            yaw: spawn.yaw,
            pitch: spawn.pitch,
        })?;
        self.send(&Packet::SetPositionAndOrientation {
            player_id: player.id,
            x: spawn.x,
            y: spawn.y,
            z: spawn.z,
            yaw: spawn.yaw,
            pitch: spawn.pitch,
        })?;

        tracing::debug!(
            "Spawned {} at ({}, {}, {})",
            player.name,
            spawn.x,
            spawn.y,
            spawn.z
        );
        Ok(())
    }

    /// Ping every keep-alive interval until the peer closes or the server
    /// shuts down, whichever comes first
    fn keep_alive(&mut self) -> Result<DisconnectReason> {
        let (closed_tx, closed_rx) = channel::bounded(1);
        self.watcher = Some(self.spawn_watcher(closed_tx)?);

        let ticker = channel::tick(self.config.keep_alive_interval);
        let shutdown = self.shutdown.clone();

        loop {
            crossbeam::select! {
                recv(closed_rx) -> _ => {
                    tracing::debug!("Client {} closed the connection", self.peer_addr);
                    return Ok(DisconnectReason::PeerClosed);
                }
                recv(shutdown) -> _ => return Ok(DisconnectReason::Shutdown),
                recv(ticker) -> _ => {
                    // select! picks randomly among ready arms
                    if peer_closed(&closed_rx) {
                        tracing::debug!("Client {} closed the connection", self.peer_addr);
                        return Ok(DisconnectReason::PeerClosed);
                    }
                    self.send(&Packet::Ping)?
                }
            }
        }
    }

    fn spawn_watcher(&self, closed: Sender<()>) -> Result<JoinHandle<()>> {
        let mut stream = self.reader.get_ref().try_clone()?;
        let peer_addr = self.peer_addr.clone();

        let handle = thread::Builder::new()
            .name(format!("watch-{}", peer_addr))
            .spawn(move || {
                let mut buf = [0u8; 512];
                loop {
                    match stream.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => tracing::trace!("Ignoring {} bytes from {}", n, peer_addr),
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => {
                            tracing::trace!("Watcher for {} stopped: {}", peer_addr, e);
                            break;
                        }
                    }
                }
                let _ = closed.send(());
            })?;

        Ok(handle)
    }

    // =========================================================================
    // Disconnected
    // =========================================================================

    /// Shut the socket down; safe to call more than once
    fn close(&mut self) {
        if self.phase != SessionPhase::Disconnected {
            self.phase = SessionPhase::Disconnected;
            let _ = self.writer.get_ref().shutdown(Shutdown::Both);
        }

        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }

    fn send(&mut self, packet: &Packet) -> Result<()> {
        tracing::trace!("-> {} {}", self.peer_addr, packet.id().name());
        write_packet(&mut self.writer, packet)
    }
}

/// True once the watcher reported EOF or exited
fn peer_closed(closed: &Receiver<()>) -> bool {
    !matches!(closed.try_recv(), Err(TryRecvError::Empty))
}
