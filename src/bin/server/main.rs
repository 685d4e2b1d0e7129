//! Canopy HTTP Server
//!
//! Serves the read-only query API over an in-memory reading store seeded
//! from a JSON file and a sensor registry taken from configuration.
//!
//! # CLI Commands
//!
//! - `start` - Start the HTTP server (default if no command specified)
//! - `check-config` - Validate configuration file
//!
//! # Configuration
//!
//! The server reads configuration from:
//! 1. `--config` argument
//! 2. `CANOPY_CONFIG` environment variable (path to TOML file)
//! 3. `./canopy.toml` in current directory
//! 4. Default configuration

use canopy::{
    config::Config,
    engine::{MemoryReadingStore, MemoryRegistry},
    query::{EngineSettings, QueryEngine},
    server::{self, AppState},
};
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::signal;
use tracing::{debug, info, warn};

// =============================================================================
// CLI Definition
// =============================================================================

/// Canopy - sensor time-series query engine
#[derive(Parser)]
#[command(name = "canopy-server")]
#[command(version)]
#[command(about = "Query and aggregation API for grow-room sensor readings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (overrides CANOPY_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override listen address (e.g., 0.0.0.0:8080)
    #[arg(short, long, global = true)]
    listen: Option<String>,

    /// Override the JSON file readings are seeded from
    #[arg(short, long, global = true)]
    seed: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Start,

    /// Validate configuration file without starting the server
    CheckConfig,
}

/// Load configuration and apply CLI overrides
fn load_config(cli: &Cli) -> Result<(Config, Option<PathBuf>), Box<dyn std::error::Error>> {
    let (mut config, source) = Config::load(cli.config.as_deref())?;

    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen.clone();
    }
    if let Some(seed) = &cli.seed {
        config.storage.seed_file = Some(seed.clone());
    }

    Ok((config, source))
}

// =============================================================================
// CLI Command Handlers
// =============================================================================

/// Validate configuration and print summary
fn cmd_check_config(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (config, source) = load_config(cli)?;

    println!("Configuration is valid!");
    println!();
    match &source {
        Some(path) => println!("Source: {}", path.display()),
        None => println!("Source: built-in defaults"),
    }
    println!();
    println!("Server Settings:");
    println!("  Listen address: {}", config.server.listen_addr);
    println!("  Log level: {}", config.server.log_level);
    println!();
    println!("Query Settings:");
    println!("  Page size: {}", config.query.page_size);
    println!(
        "  Default window: {} hours",
        config.query.default_window_hours
    );
    println!();
    println!("Storage:");
    match &config.storage.seed_file {
        Some(path) => println!("  Seed file: {}", path.display()),
        None => println!("  Seed file: none (empty store)"),
    }
    println!(
        "  Registered sensors: {}",
        config.registry.sensors.len()
    );

    Ok(())
}

// =============================================================================
// Server Setup
// =============================================================================

/// Build the collaborators and engine from configuration
fn init_engine(config: &Config) -> Result<QueryEngine, Box<dyn std::error::Error>> {
    let store = match &config.storage.seed_file {
        Some(path) => MemoryReadingStore::from_json_file(path)?,
        None => {
            warn!("No seed file configured, starting with an empty reading store");
            MemoryReadingStore::new()
        },
    };
    let registry = MemoryRegistry::with_assignments(config.registry.sensors.iter().cloned());

    debug!(
        readings = store.len(),
        sensors = registry.len(),
        "Collaborators initialized"
    );

    Ok(QueryEngine::new(Arc::new(store), Arc::new(registry))
        .with_settings(EngineSettings::from_config(config)))
}

/// Graceful shutdown signal handler
///
/// Signal registration failures are logged and the corresponding branch
/// waits forever, so startup never panics.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {},
            Err(e) => {
                warn!(
                    error = %e,
                    "Ctrl+C handler installation failed - graceful shutdown unavailable"
                );
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                warn!(
                    error = %e,
                    "SIGTERM handler installation failed - SIGTERM shutdown unavailable"
                );
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::CheckConfig) => return cmd_check_config(&cli),
        Some(Commands::Start) | None => {},
    }

    let (config, source) = load_config(&cli)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("Starting Canopy Server v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        config_file = ?source,
        listen_addr = %config.server.listen_addr,
        "Configuration loaded"
    );

    let engine = init_engine(&config)?;
    let state = Arc::new(AppState::new(engine, config.server.clone()));
    let app = server::router(state);

    let addr: SocketAddr = config.server.listen_addr.parse()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
