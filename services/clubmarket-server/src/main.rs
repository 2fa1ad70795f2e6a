//! ClubMarket Server
//!
//! HTTP server for the club marketplace: listing catalogue, offer
//! negotiation, fee payments, and post-sale reputation.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! clubmarket-server
//!
//! # Start with custom config
//! clubmarket-server --config /path/to/config.toml
//!
//! # Start with environment overrides
//! CLUBMARKET__SERVER__PORT=8080 clubmarket-server
//! ```

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clubmarket_api::notify::LogNotifier;
use clubmarket_api::{create_router, ApiConfig, AppState};
use clubmarket_core::{FeeSchedule, FeeService};
use clubmarket_db::{Database, DatabaseConfig as DbConfig, DbFeeConfig};
use clubmarket_types::{FeeConfigId, FeeType, UserId};

use crate::config::ServerConfig;

/// ClubMarket Server - marketplace for second-hand club gear
#[derive(Parser, Debug)]
#[command(name = "clubmarket-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "CLUBMARKET_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "CLUBMARKET_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CLUBMARKET_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CLUBMARKET_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "CLUBMARKET_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;

    // Override with CLI arguments
    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(db_url) = args.database_url {
        server_config.database.postgres_url = db_url;
    }
    server_config.logging.level = args.log_level;
    server_config.logging.format = args.log_format;

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting ClubMarket Server"
    );

    let db = init_database(&server_config.database).await?;

    // Seed the fee cache from the active configuration row. The service
    // starts unconfigured when no row exists; fee-charging endpoints answer
    // 503 until an admin installs one.
    let fees = Arc::new(FeeService::new());
    match db.fee_config_repo().find_active().await? {
        Some(cfg) => {
            let schedule = schedule_from_row(&cfg)?;
            tracing::info!(fee_config_id = %cfg.id, "Active fee configuration loaded");
            fees.install(schedule);
        }
        None => {
            tracing::warn!("No active fee configuration; fee endpoints unavailable until one is installed");
        }
    }

    let state = Arc::new(AppState::new(
        db.clone(),
        fees,
        Arc::new(LogNotifier),
    ));

    if server_config.sweep.enabled {
        spawn_sweep_task(db.clone(), server_config.sweep.interval());
    }

    let api_config = ApiConfig {
        enable_cors: server_config.api.enable_cors,
        cors_origins: server_config.api.cors_origins.clone(),
        enable_tracing: server_config.api.enable_tracing,
    };
    let app = create_router(state, api_config);

    let addr = server_config.server.socket_addr()?;

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber.with(fmt::layer().pretty().with_target(true)).init();
        }
    }

    Ok(())
}

/// Initialize database connection and run migrations
async fn init_database(config: &config::DatabaseConfig) -> anyhow::Result<Arc<Database>> {
    tracing::info!("Connecting to database...");

    let db_config = DbConfig {
        postgres_url: config.postgres_url.clone(),
        pg_max_connections: config.max_connections,
        pg_min_connections: config.min_connections,
        pg_acquire_timeout_secs: config.connect_timeout_secs,
    };

    let db = Database::connect(&db_config).await?;

    tracing::info!("Database connected successfully");

    if config.run_migrations {
        tracing::info!("Running migrations...");
        db.migrate().await?;
    }

    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!("Database health check failed");
    }

    tracing::info!(postgres = health.postgres, "Database health check passed");

    Ok(Arc::new(db))
}

/// Rehydrate the in-memory fee schedule from its persisted row.
fn schedule_from_row(cfg: &DbFeeConfig) -> anyhow::Result<FeeSchedule> {
    let fee_type = FeeType::parse(&cfg.fee_type)
        .ok_or_else(|| anyhow::anyhow!("Unknown fee type in fee_configs row: {}", cfg.fee_type))?;
    Ok(FeeSchedule {
        id: FeeConfigId::from_uuid(cfg.id),
        posting_fee: cfg.posting_fee,
        extension_fee: cfg.extension_fee,
        featured_fee: cfg.featured_fee,
        premium_fee: cfg.premium_fee,
        fee_type,
        default_expiration_days: cfg.default_expiration_days,
        extension_days: cfg.extension_days,
        max_extensions: cfg.max_extensions,
        free_posting_limit: cfg.free_posting_limit,
        free_extension_limit: cfg.free_extension_limit,
        currency: cfg.currency.clone(),
        effective_date: cfg.effective_date,
        created_by: cfg.created_by.map(UserId::from_uuid),
    })
}

/// Periodic expiry sweep: overdue listings expire and stale payment intents
/// are cancelled. The admin endpoint runs the same pass on demand.
fn spawn_sweep_task(db: Arc<Database>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a restart loop does
        // not hammer the database.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match db.listing_repo().sweep_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(expired = n, "Expired overdue listings"),
                Err(e) => tracing::error!(error = %e, "Listing expiry sweep failed"),
            }

            match db.payment_repo().sweep_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(cancelled = n, "Cancelled stale payment intents"),
                Err(e) => tracing::error!(error = %e, "Payment expiry sweep failed"),
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    // Allow time for in-flight requests to complete
    tracing::info!(
        timeout_secs = timeout.as_secs(),
        "Waiting for in-flight requests to complete..."
    );

    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["clubmarket-server", "--port", "8080"]);
        assert_eq!(args.port, Some(8080));
    }

    #[test]
    fn test_schedule_from_row() {
        let cfg = DbFeeConfig {
            id: Uuid::new_v4(),
            posting_fee: Decimal::new(250, 2),
            extension_fee: Decimal::new(100, 2),
            featured_fee: Decimal::new(500, 2),
            premium_fee: Decimal::new(1000, 2),
            fee_type: "fixed".to_string(),
            default_expiration_days: 90,
            extension_days: 30,
            max_extensions: 3,
            free_posting_limit: 3,
            free_extension_limit: 1,
            currency: "EUR".to_string(),
            is_active: true,
            effective_date: Utc::now(),
            created_by: None,
            created_at: Utc::now(),
        };
        let schedule = schedule_from_row(&cfg).unwrap();
        assert_eq!(schedule.max_extensions, 3);
        assert_eq!(schedule.fee_type, FeeType::Fixed);

        let mut bad = cfg;
        bad.fee_type = "made_up".to_string();
        assert!(schedule_from_row(&bad).is_err());
    }
}
