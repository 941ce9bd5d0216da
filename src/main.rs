use anyhow::Context;

use registrard::config::Config;
use registrard::http::{self, AppState};
use registrard::{db, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(config.log_format)?;

    let conn = db::open_db(&config.workspace)
        .with_context(|| format!("opening workspace {}", config.workspace.display()))?;
    let addr = config.bind_addr();
    tracing::info!(
        environment = ?config.environment,
        workspace = %config.workspace.display(),
        "starting registrard"
    );

    let app = http::router(AppState::new(conn, config));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
