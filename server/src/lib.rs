//! # Reunion Server
//!
//! Wires configuration, storage, email delivery and the HTTP API into one
//! process.
//!
//! ## Startup
//!
//! 1. Load `.env` and the environment into [`Config`]
//! 2. Connect to `PostgreSQL` and run migrations
//! 3. Start the email dispatcher (bounded queue + workers)
//! 4. Serve the API until Ctrl+C or SIGTERM
//! 5. Drain queued emails for up to `SHUTDOWN_TIMEOUT`

pub mod config;
pub mod metrics;

pub use config::Config;

use anyhow::Context;
use reunion_core::environment::SystemClock;
use reunion_core::RegistrationService;
use reunion_notify::{NotificationDispatcher, build_mailer};
use reunion_postgres::PostgresRegistrationStore;
use reunion_web::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Run the server until a shutdown signal arrives.
///
/// # Errors
///
/// Fails if the database is unreachable, migrations fail, or the listener
/// cannot bind. Runtime request errors never end the process.
pub async fn run(config: Config) -> anyhow::Result<()> {
    if let Some(port) = config.server.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        metrics::install_exporter(addr).context("starting metrics exporter")?;
    }

    info!("Connecting to database...");
    let store = PostgresRegistrationStore::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.connect_timeout,
    )
    .await
    .context("connecting to database")?;
    store.migrate().await.context("running migrations")?;
    info!("Database ready");
    let store = Arc::new(store);

    let mailer = build_mailer(&config.mailer);
    let dispatcher = Arc::new(NotificationDispatcher::spawn(&config.mailer, mailer, store.clone()));

    if config.admin.token.is_empty() {
        warn!("ADMIN_TOKEN is not set; every admin route will answer 401");
    }

    let service = RegistrationService::new(store, dispatcher.clone(), config.pricing.clone(), Arc::new(SystemClock));
    let app = reunion_web::router(AppState::new(service, config.admin.token.as_str()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!(timeout = ?config.server.shutdown_timeout, "Draining email queue");
    if !dispatcher.shutdown(config.server.shutdown_timeout).await {
        error!("Email queue not drained; undelivered confirmations stay unsent until the next resend");
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for Ctrl+C, or SIGTERM on Unix. A handler that cannot be installed
/// is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
