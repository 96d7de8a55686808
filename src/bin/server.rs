//! Classic Server Binary
//!
//! Starts the TCP server for the Classic protocol.

use std::time::Duration;

use clap::Parser;
use classic_server::config::{AcceptMode, LevelEncoding, Terrain, UserType};
use classic_server::{Config, Dimensions, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// Classic Server
#[derive(Parser, Debug)]
#[command(name = "classic-server")]
#[command(about = "Server for the Classic block-game protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:25565")]
    listen: String,

    /// Server name shown while loading
    #[arg(short, long, default_value = "Classic Server")]
    name: String,

    /// Message of the day
    #[arg(long, default_value = "Welcome!")]
    motd: String,

    /// Grant operator rights to every player
    #[arg(long)]
    op: bool,

    /// World width (X)
    #[arg(short = 'x', long, default_value = "256")]
    width: u16,

    /// World height (Y)
    #[arg(short = 'y', long, default_value = "64")]
    height: u16,

    /// World depth (Z)
    #[arg(short = 'z', long, default_value = "256")]
    depth: u16,

    /// Ground level for the flat terrain (defaults to half the height)
    #[arg(short, long)]
    ground: Option<u16>,

    /// Send an all-air world
    #[arg(long)]
    empty: bool,

    /// Prefix the level with its block count before compression
    #[arg(long)]
    length_prefix: bool,

    /// Gzip level for the level stream (0-9)
    #[arg(long, default_value = "6")]
    compression: u32,

    /// Seconds between keep-alive pings
    #[arg(short, long, default_value = "2")]
    keep_alive: u64,

    /// Serve one client at a time
    #[arg(long)]
    sequential: bool,

    /// Maximum concurrent sessions
    #[arg(short, long, default_value = "64")]
    max_connections: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,classic_server=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Classic Server v{}", classic_server::VERSION);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("World size: {}x{}x{}", args.width, args.height, args.depth);

    let terrain = if args.empty {
        Terrain::Empty
    } else {
        Terrain::Flat {
            ground_height: args.ground.unwrap_or(args.height / 2),
        }
    };

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .server_name(&args.name)
        .motd(&args.motd)
        .user_type(if args.op { UserType::Operator } else { UserType::Normal })
        .world_dimensions(Dimensions::new(args.width, args.height, args.depth))
        .terrain(terrain)
        .level_encoding(if args.length_prefix {
            LevelEncoding::LengthPrefixed
        } else {
            LevelEncoding::Raw
        })
        .compression_level(args.compression)
        .keep_alive_interval(Duration::from_secs(args.keep_alive))
        .accept_mode(if args.sequential {
            AcceptMode::Sequential
        } else {
            AcceptMode::Concurrent
        })
        .max_connections(args.max_connections)
        .build();

    let server = match Server::bind(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
