//! Portfolio Pair Daemon
//!
//! Serves the matching and portfolio API over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Start with a secret from the environment
//! PORTFOLIO_PAIR_JWT_SECRET=... portfolio-pair
//!
//! # Local development with the fixed dev secret
//! portfolio-pair --dev
//!
//! # Custom config, port and storage directory
//! portfolio-pair --config /etc/portfolio-pair.toml --http-port 8096 --storage-dir /data/pair
//!
//! # Print a dev token for a test user
//! portfolio-pair --dev --issue-token adv-1:Ada:advisor
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use portfolio_pair::auth::TokenInput;
use portfolio_pair::services::events::spawn_logging_listener;
use portfolio_pair::{Config, HttpServer, Role, Services, SqliteStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portfolio-pair")]
#[command(about = "Advisor matching and portfolio visibility service")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long)]
    http_port: Option<u16>,

    /// HS256 secret for bearer tokens
    #[arg(long, env = "PORTFOLIO_PAIR_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Accept tokens signed with the fixed development secret
    #[arg(long)]
    dev: bool,

    /// Print a token for `id:name:role` and exit
    #[arg(long, value_name = "ID:NAME:ROLE")]
    issue_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("portfolio_pair=info".parse()?))
        .init();

    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if args.jwt_secret.is_some() {
        config.jwt_secret = args.jwt_secret;
    }
    config.dev_mode |= args.dev;

    let identity = config.identity_provider()?;

    if let Some(arg) = args.issue_token {
        let input = parse_token_arg(&arg)?;
        println!("{}", identity.validator().generate_token(input)?);
        return Ok(());
    }

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        dev_mode = config.dev_mode,
        "Starting portfolio-pair"
    );

    // Ensure storage directory exists
    tokio::fs::create_dir_all(&config.storage_dir).await?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let store = Arc::new(
        SqliteStore::open(&config.storage_dir, config.busy_timeout())
            .context("failed to open record store")?,
    );
    let stats = store.stats()?;
    info!(
        actors = stats.actor_count,
        assignments = stats.assignment_count,
        portfolios = stats.portfolio_count,
        "Record store ready"
    );

    let services = Arc::new(Services::new(store.clone()));
    let listener = spawn_logging_listener(services.events.clone());

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let http_server = Arc::new(HttpServer::new(services, Arc::new(identity), http_addr));

    info!("HTTP API available at http://{}", http_addr);
    info!("Press Ctrl+C to stop.");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    listener.abort();

    if let Ok(stats) = store.stats() {
        info!(
            actors = stats.actor_count,
            assignments = stats.assignment_count,
            portfolios = stats.portfolio_count,
            "Final record counts"
        );
    }

    Ok(())
}

fn parse_token_arg(arg: &str) -> anyhow::Result<TokenInput> {
    let mut parts = arg.splitn(3, ':');
    let (Some(sub), Some(name), Some(role)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected ID:NAME:ROLE, got {}", arg);
    };

    Ok(TokenInput {
        sub: sub.to_string(),
        name: name.to_string(),
        role: role.parse::<Role>()?,
    })
}
