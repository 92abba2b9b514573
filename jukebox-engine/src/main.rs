//! Jukebox engine - main entry point
//!
//! Runs the playback scheduler against a base directory shared with the
//! front-end, or performs one maintenance command and exits.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jukebox_common::config::{resolve_base_dir, LoggingConfig, TomlConfig};
use jukebox_engine::engine::Engine;
use jukebox_engine::playback::CommandPlayer;
use jukebox_engine::queue_store::QueueStore;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for jukebox-engine
#[derive(Parser, Debug)]
#[command(name = "jukebox-engine")]
#[command(about = "Playback engine for a coin-operated jukebox")]
#[command(version)]
struct Args {
    /// Base directory holding the shared files (default: $JUKEBOX_BASE_DIR or the OS data dir)
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play paid requests and random tracks until stopped (default)
    Run,
    /// Rebuild the catalog from the music directory
    Rebuild,
    /// Show the most played songs
    Stats {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// List the genre tokens found in the catalog
    Genres,
    /// Append a catalog index to the paid queue
    Enqueue { index: usize },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let base_dir = resolve_base_dir(args.base_dir.as_deref());
    std::fs::create_dir_all(&base_dir)
        .with_context(|| format!("Failed to create base directory {}", base_dir.display()))?;

    let (config, config_status) = TomlConfig::load_or_create(&base_dir);
    init_tracing(&config.logging, args.log_level.as_deref(), &base_dir)?;
    config_status.log();

    info!(
        "Starting jukebox engine v{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Base directory: {}", base_dir.display());

    let engine = Engine::new(&base_dir, config);

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let player = CommandPlayer::from_config(&engine.config().player);
            let summary = engine
                .run(Box::new(player), shutdown_signal())
                .await
                .context("Engine failed")?;
            info!("Engine stopped: {:?}", summary.stop_reason);
        }
        Commands::Rebuild => {
            let catalog = engine
                .rebuild_catalog()
                .context("Failed to rebuild catalog")?;
            println!("Catalog rebuilt: {} tracks", catalog.len());
        }
        Commands::Stats { limit } => {
            let stats = engine.statistics();
            println!(
                "{} songs, {} plays recorded",
                stats.len(),
                stats.total_plays()
            );
            for (rank, song) in stats.top_songs(limit).iter().enumerate() {
                println!(
                    "{:>3}. [{}] {} - {} ({} plays, last {})",
                    rank + 1,
                    song.index,
                    song.artist,
                    song.title,
                    song.play_count,
                    song.last_played.as_deref().unwrap_or("never")
                );
            }
        }
        Commands::Genres => {
            for genre in engine.genres().context("Failed to load catalog")? {
                println!("{}", genre);
            }
        }
        Commands::Enqueue { index } => {
            engine.ensure_files().context("Failed to prepare base directory")?;
            let catalog = engine
                .catalog_store()
                .load_or_build()
                .context("Failed to load catalog")?;
            let track = catalog
                .get(index)
                .with_context(|| format!("Index {} not in catalog ({} tracks)", index, catalog.len()))?;
            QueueStore::new(&engine.paths().paid_queue)
                .append(index as i64)
                .context("Failed to update paid queue")?;
            println!("Queued [{}] {} - {}", index, track.artist, track.title);
        }
    }

    Ok(())
}

/// Console logging, plus a plain-text file when configured
///
/// Level priority: `--log-level`, then `RUST_LOG`, then the config file.
fn init_tracing(logging: &LoggingConfig, cli_level: Option<&str>, base_dir: &Path) -> Result<()> {
    let directives = |level: &str| format!("jukebox_engine={0},jukebox_common={0}", level);

    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(directives(level)).context("Invalid --log-level")?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directives(&logging.level))),
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                base_dir.join(path)
            };
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
