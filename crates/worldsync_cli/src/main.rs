//! WorldSync CLI
//!
//! Command-line client for WorldSync world synchronization.
//!
//! # Commands
//!
//! - `init` - Initialize sync state for a world directory
//! - `push` - Record the current world as a new commit (local operation)
//! - `pull` - Fetch and merge the branch head from the server
//! - `history` - Show commit history

use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use worldsync_client::{ClientConfig, PullOutcome, SyncService, TcpTransport};
use worldsync_store::CommitStore;

/// WorldSync world-save synchronization client.
#[derive(Parser)]
#[command(name = "worldsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Minecraft world directory
    #[arg(global = true, short, long, default_value = ".")]
    world: PathBuf,

    /// Sync server address
    #[arg(global = true, short, long, default_value = "127.0.0.1:9090")]
    server: String,

    /// Branch name
    #[arg(global = true, short, long, default_value = "main")]
    branch: String,

    /// Path to the repository database
    #[arg(global = true, short, long, default_value = "worldsync.db")]
    database: PathBuf,

    /// Enable verbose output
    #[arg(global = true, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize sync state for a world directory
    Init,

    /// Record the current world as a new commit (local operation)
    Push {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Author name
        #[arg(short, long)]
        author: String,
    },

    /// Fetch and merge the branch head from the server
    Pull,

    /// Show commit history
    History {
        /// Number of commits to show
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new(cli.server, cli.branch);
    let store = Arc::new(CommitStore::open(&cli.database)?);
    let transport = TcpTransport::new(config.server_addr.clone(), config.timeout)?;
    let mut service = SyncService::new(config, &cli.world, store, transport)?;

    match cli.command {
        Commands::Init => {
            service.init().map_err(|err| format!("Initialization failed: {err}"))?;
            println!("Repository initialized in: {}", cli.world.display());
        }
        Commands::Push { message, author } => {
            let id = service
                .push(&message, &author)
                .map_err(|err| format!("Push failed: {err}"))?;
            println!("Pushed successfully! Commit ID: {id}");
        }
        Commands::Pull => {
            let outcome = service.pull().map_err(|err| format!("Pull failed: {err}"))?;
            match outcome {
                PullOutcome::UpToDate => println!("Already up-to-date"),
                PullOutcome::Applied {
                    new_head,
                    updated_files,
                } => {
                    println!("Pulled successfully!");
                    println!("New commit: {}", new_head.as_deref().unwrap_or("none"));
                    println!("Updated files: {updated_files:?}");
                }
            }
        }
        Commands::History { limit } => {
            let commits = service
                .history(limit)
                .map_err(|err| format!("Failed to get history: {err}"))?;
            println!("Commit History:");
            for commit in commits {
                let when = DateTime::from_timestamp_millis(commit.timestamp)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| commit.timestamp.to_string());
                println!(
                    "[{}] {} - {}\n  {}",
                    commit.short_id(),
                    commit.author,
                    when,
                    commit.message
                );
            }
        }
    }

    Ok(())
}
