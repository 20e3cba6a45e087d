use std::net::SocketAddr;

use anyhow::Context;
use taskboard_core::Database;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Cli;
use crate::logging::init_logging;
use crate::routes::build_router;
use crate::state::AppState;

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Opens the database, serves until SIGINT/SIGTERM, then closes the pool.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let options = cli.server_options();
    init_logging(&options.log_mode)?;

    let db = match &cli.database_url {
        Some(url) => Database::connect(url).await,
        None => Database::connect_default().await,
    }
    .context("opening task database")?;

    let bind_addr = cli.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    info!(
        addr = %bind_addr,
        environment = options.mode.as_str(),
        rate_limited = options.rate_limit.is_some(),
        "server running, API available at /api/tasks"
    );

    let app = build_router(AppState::new(db.clone(), options));
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    db.close().await;
    info!("server stopped");

    served.context("serving HTTP")
}
