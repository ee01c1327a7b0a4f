//! detectived — the Optimization Detective daemon.
//!
//! Single binary that assembles the page-metric pipeline:
//! - Metrics store (redb)
//! - Storage lock housekeeping
//! - REST API
//!
//! # Usage
//!
//! ```text
//! detectived serve --config detective.toml --port 8080 --data-dir /var/lib/detective
//! detectived prefix '/shop/*' --context site --config detective.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::{Parser, Subcommand};
use detective_core::{DetectiveConfig, UrlPatternPrefixer};
use detective_state::StateStore;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "detectived", about = "Optimization Detective daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the page-metric collection API.
    Serve {
        /// Path to detective.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for persistent state (overrides the config file).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Prefix a URL path pattern with the configured base path.
    Prefix {
        /// Path pattern, e.g. `/shop/*`.
        pattern: String,

        /// Either `home` or `site`.
        #[arg(long, default_value = "home")]
        context: String,

        /// Path to detective.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,detectived=debug,detective=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir;
            }
            run_server(config).await
        }
        Command::Prefix {
            pattern,
            context,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let prefixer = UrlPatternPrefixer::new(config.url_patterns.contexts());
            println!("{}", prefixer.prefix_or_passthrough(&pattern, &context));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DetectiveConfig> {
    let config = match path {
        Some(path) => DetectiveConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => DetectiveConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

async fn run_server(config: DetectiveConfig) -> anyhow::Result<()> {
    info!("Optimization Detective daemon starting");

    // Ensure data directory exists.
    std::fs::create_dir_all(&config.server.data_dir)?;
    let db_path = config.server.data_dir.join("detective.redb");

    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "metrics store opened");
    info!(
        breakpoints = ?config.metrics.normalized().breakpoints,
        sample_size = config.metrics.sample_size,
        grouping = ?config.metrics.grouping,
        lock_ttl = config.lock.ttl_secs,
        "metrics pipeline configured"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let purge_handle = (config.lock.ttl_secs > 0).then(|| {
        let store = store.clone();
        let interval = Duration::from_secs(config.lock.ttl_secs);
        tokio::spawn(purge_expired_locks(store, interval, shutdown_rx))
    });

    // ── Start API server ───────────────────────────────────────

    let router = detective_api::build_router(store, &config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    if let Some(handle) = purge_handle {
        let _ = handle.await;
    }

    info!("Optimization Detective daemon stopped");
    Ok(())
}

/// Periodically drop lock entries that can no longer lock anyone.
async fn purge_expired_locks(store: StateStore, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.purge_expired_locks(epoch_secs()) {
                    Ok(0) => {}
                    Ok(count) => debug!(count, "purged expired storage locks"),
                    Err(e) => warn!(error = %e, "failed to purge storage locks"),
                }
            }
            _ = shutdown.changed() => {
                info!("lock purge loop shutting down");
                break;
            }
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
