//! Classic Probe
//!
//! Diagnostic client: joins a server, follows the packet stream and prints
//! a summary of what it received.

use std::io::{BufReader, BufWriter, Read};
use std::net::TcpStream;

use clap::Parser;
use classic_server::protocol::{
    from_fixed_point, read_packet, write_packet, Packet, PROTOCOL_VERSION,
};
use classic_server::Result;
use flate2::read::GzDecoder;
use tracing_subscriber::{fmt, EnvFilter};

/// Classic Probe
#[derive(Parser, Debug)]
#[command(name = "classic-probe")]
#[command(about = "Join a Classic server and report the packets it sends")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:25565")]
    server: String,

    /// Username to announce
    #[arg(short, long, default_value = "probe")]
    username: String,

    /// Protocol version to announce
    #[arg(short, long, default_value_t = PROTOCOL_VERSION)]
    protocol_version: u8,

    /// Pings to wait for after spawning
    #[arg(long, default_value = "1")]
    pings: u32,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();

    if let Err(e) = probe(&args) {
        eprintln!("Probe failed: {}", e);
        std::process::exit(1);
    }
}

fn probe(args: &Args) -> Result<()> {
    let stream = TcpStream::connect(&args.server)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    write_packet(
        &mut writer,
        &Packet::ServerIdentification {
            protocol_version: args.protocol_version,
            server_name: args.username.clone(),
            motd: String::new(),
            user_type: 0,
        },
    )?;

    let mut level = Vec::new();
    let mut frames = 0usize;
    let mut pings = 0u32;

    while pings < args.pings {
        match read_packet(&mut reader)? {
            Packet::ServerIdentification {
                protocol_version,
                server_name,
                motd,
                user_type,
            } => {
                println!("server:   {} (protocol {}, user type 0x{:02x})", server_name, protocol_version, user_type);
                println!("motd:     {}", motd);
            }
            Packet::LevelInitialize => println!("level:    receiving"),
            Packet::LevelDataChunk {
                chunk_length,
                chunk_data,
                percent_complete,
            } => {
                let length = usize::try_from(chunk_length).unwrap_or(0).min(chunk_data.len());
                level.extend_from_slice(&chunk_data[..length]);
                frames += 1;
                tracing::debug!("frame {} ({}%)", frames, percent_complete);
            }
            Packet::LevelFinalize {
                x_size,
                y_size,
                z_size,
            } => {
                let mut blocks = Vec::new();
                GzDecoder::new(level.as_slice()).read_to_end(&mut blocks)?;
                println!(
                    "level:    {}x{}x{}, {} frames, {} compressed bytes, {} decompressed",
                    x_size,
                    y_size,
                    z_size,
                    frames,
                    level.len(),
                    blocks.len()
                );
            }
            Packet::SpawnPlayer {
                player_id,
                player_name,
                x,
                y,
                z,
                ..
            } => println!(
                "spawn:    #{} {} at ({}, {}, {})",
                player_id,
                player_name,
                from_fixed_point(x),
                from_fixed_point(y),
                from_fixed_point(z)
            ),
            Packet::SetPositionAndOrientation { x, y, z, yaw, pitch, .. } => {
                println!("position: ({}, {}, {}) yaw {} pitch {}", x, y, z, yaw, pitch)
            }
            Packet::Ping => {
                pings += 1;
                println!("ping:     {}", pings);
            }
            Packet::DisconnectPlayer { reason } => {
                println!("kicked:   {}", reason);
                return Ok(());
            }
        }
    }

    Ok(())
}
