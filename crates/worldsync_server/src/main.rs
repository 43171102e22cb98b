//! WorldSync server binary.
//!
//! Starts the framed TCP sync endpoint and the read-only HTTP API on the
//! loopback interface, backed by one repository database.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use worldsync_server::{http, ServerConfig, SyncServer};
use worldsync_store::CommitStore;

/// WorldSync repository server.
#[derive(Parser)]
#[command(name = "worldsync-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the TCP sync endpoint
    #[arg(long, default_value_t = 9090)]
    tcp_port: u16,

    /// Port for the read-only HTTP API
    #[arg(long, default_value_t = 9091)]
    http_port: u16,

    /// Path to the repository database
    #[arg(long, default_value = "worldsync.db")]
    database: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = Arc::new(CommitStore::open(&args.database)?);
    tracing::info!(database = %args.database.display(), "repository opened");

    let config = ServerConfig::default()
        .with_tcp_addr(SocketAddr::from(([127, 0, 0, 1], args.tcp_port)))
        .with_http_addr(SocketAddr::from(([127, 0, 0, 1], args.http_port)));
    let http_addr = config.http_addr;

    let server = SyncServer::new(config, Arc::clone(&store));
    tokio::try_join!(server.run(), http::serve(http_addr, store))?;
    Ok(())
}
