//! Alumni reunion registration HTTP server.

use reunion_server::Config;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::panic::set_hook(Box::new(|panic| {
        error!(%panic, "Unrecoverable panic; exiting");
        std::process::exit(1);
    }));

    info!(
        host = %config.server.host,
        port = config.server.port,
        email_dev_mode = config.mailer.dev_mode,
        email_workers = config.mailer.workers,
        "Starting reunion registration server"
    );

    if let Err(e) = reunion_server::run(config).await {
        error!(error = ?e, "Server failed");
        return Err(e);
    }
    Ok(())
}
