//! Securinets Registration Portal
//!
//! Entry point of the event registration portal. The service serves the public
//! registration form and the admin dashboard over HTTP; every persistence and
//! authentication operation is delegated to a hosted backend.
//!
//! # Architecture
//! The service is built using:
//! - axum for the HTTP surface
//! - a Supabase-style hosted backend for auth and table storage
//! - in-memory admin sessions and rate limiters
//!
//! # Flow
//! 1. Registrant fills in the form; the email is checked for uniqueness
//! 2. Service validates the form and creates the auth user
//! 3. Service inserts the profile row, rolling back the auth user on failure
//! 4. Admins sign in to review, search, export and promote registrants

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use securinets_registration::admin::AdminService;
use securinets_registration::backend::{HostedBackend, SupabaseClient};
use securinets_registration::config::{Config, LoggingConfig, DEFAULT_CONFIG_PATH};
use securinets_registration::rate_limit::{RateLimitConfig, RateLimiter};
use securinets_registration::registration::RegistrationService;
use securinets_registration::session::SessionStore;
use securinets_registration::web::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "securinets-registration", about = "Securinets event registration portal")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the configured level. JSON output is
/// meant for log shipping; the default is human-readable.
fn setup_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_level(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.with_ansi(true).try_init()
    };
    result.map_err(|e| anyhow::anyhow!(e))
}

/// Periodically purges expired admin sessions.
fn spawn_session_cleanup(sessions: SessionStore, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "Purged expired admin sessions");
            }
        }
    });
}

/// Builds the services and runs the HTTP server until Ctrl-C.
async fn setup_services(config: Config) -> anyhow::Result<()> {
    info!(url = %config.backend.url, "Initializing hosted backend client");
    let backend: Arc<dyn HostedBackend> = Arc::new(
        SupabaseClient::new(&config.backend).context("failed to create backend client")?,
    );

    let registration = RegistrationService::new(
        backend.clone(),
        RateLimiter::new(
            "registration",
            RateLimitConfig::from(config.rate_limits.registration.clone()),
        ),
        config.registration.closes_at,
    );
    match registration.closes_at() {
        Some(closes_at) => info!(%closes_at, "Registration window configured"),
        None => info!("Registration has no closing date"),
    }

    let sessions = SessionStore::new();
    spawn_session_cleanup(
        sessions.clone(),
        Duration::from_secs(config.admin.cleanup_interval_secs.max(1)),
    );

    let admin = AdminService::new(
        backend,
        sessions,
        RateLimiter::new(
            "admin_login",
            RateLimitConfig::from(config.rate_limits.admin_login.clone()),
        ),
        config.admin.session_ttl(),
        config.admin.min_password_length,
        config.registration.export_prefix.clone(),
    );

    let addr = config.bind_address();
    let app = build_router(AppState::new(config, registration, admin));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_path(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config))?;
    setup_logging(&config.logging)?;
    info!(application = %config.application.name, "Registration portal starting up...");

    setup_services(config).await
}
