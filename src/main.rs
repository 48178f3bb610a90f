//! MPRIS Scrobbler - Main entry point

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use mpris_scrobbler::config::Config;
use mpris_scrobbler::error::Result;
use mpris_scrobbler::mpris::MprisMonitor;
use mpris_scrobbler::scrobbler::{self, LastFmClient};

#[derive(Parser)]
#[command(name = "mpris-scrobbler")]
#[command(author, version, about = "Scrobble MPRIS players to Last.fm")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MPRIS_SCROBBLER_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start scrobbling (runs in foreground)
    Run,

    /// Authorize with Last.fm and store the session key
    Auth {
        /// Re-authorize even if a session key is already stored
        #[arg(long)]
        force: bool,
    },

    /// Show or edit configuration
    Config {
        /// Print current configuration
        #[arg(long)]
        show: bool,

        /// Create default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config = if let Some(ref path) = cli.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };
    config.validate()?;

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(config.general.log_level.to_lowercase())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_scrobbler(config).await,

        Commands::Auth { force } => run_auth(config, force).await,

        Commands::Config { show, init } => {
            if init {
                let default_config = Config::default();
                default_config.save()?;
                println!(
                    "Created default configuration at {}",
                    Config::config_path()?.display()
                );
            } else if show {
                let contents = toml::to_string_pretty(&config)?;
                println!("{contents}");
            } else {
                println!("Configuration path: {}", Config::config_path()?.display());
            }
            Ok(())
        }
    }
}

async fn run_scrobbler(config: Config) -> Result<()> {
    config.validate_credentials()?;
    let session_key = config.session_key()?;

    let client = LastFmClient::from_config(&config.lastfm, session_key)?;
    tracing::info!(
        "Using Last.fm API at {} (poll every {}s)",
        config.lastfm.api_url,
        config.tracking.poll_interval_seconds
    );

    let mut monitor = MprisMonitor::new(client, &config).await?;

    // Handle shutdown signals
    let stop = monitor.stop_handle();
    tokio::spawn(async move {
        let _ = signal::ctrl_c().await;
        tracing::info!("Received shutdown signal, stopping...");
        stop.stop();
    });

    #[cfg(unix)]
    {
        let stop = monitor.stop_handle();
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::spawn(async move {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, stopping...");
                    stop.stop();
                });
            }
            Err(e) => {
                tracing::warn!("Failed to register SIGTERM handler: {}. Use Ctrl+C to stop.", e);
            }
        }
    }

    monitor.run().await
}

async fn run_auth(config: Config, force: bool) -> Result<()> {
    config.validate_credentials()?;
    let path = config.session_key_path()?;

    if path.exists() && !force {
        println!(
            "Session key already stored at {} (use --force to re-authorize)",
            path.display()
        );
        return Ok(());
    }

    let client = LastFmClient::new(
        &config.lastfm.api_url,
        &config.lastfm.api_key,
        &config.lastfm.api_secret,
    )?;
    let session_key = scrobbler::authorize(&client).await?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &session_key)?;

    println!("Session key saved to {}", path.display());
    Ok(())
}
