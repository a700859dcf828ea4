//! # regcheck-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `HOST:PORT` (default 0.0.0.0:3000)
//! and shuts down gracefully on SIGINT or SIGTERM.

use std::net::SocketAddr;

use regcheck_api::state::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(?config, "configuration loaded");

    let boot = regcheck_api::bootstrap::bootstrap(config.clone()).map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;

    let app = regcheck_api::app(boot.state);

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!("regcheck API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    for task in boot.tasks {
        task.abort();
    }
    tracing::info!("server stopped");
    Ok(())
}

/// Initialize structured tracing. `RUST_LOG` overrides the default `info`.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
