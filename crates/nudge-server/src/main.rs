mod config;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use nudge_api::state::AppStateInner;
use nudge_gateway::registry::SubscriberRegistry;
use nudge_gateway::scanner::Scanner;
use nudge_store::ReminderStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nudge_server=debug,nudge_api=debug,nudge_gateway=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Shared state
    let shutdown = CancellationToken::new();
    let store = Arc::new(ReminderStore::new());
    let registry = SubscriberRegistry::new(config.subscriber_buffer);

    let scanner = Scanner::new(store.clone(), registry.clone()).with_interval(config.scan_interval);
    let scanner_task = tokio::spawn(scanner.run(shutdown.clone()));

    let state = Arc::new(AppStateInner {
        store,
        registry,
        shutdown: shutdown.clone(),
        write_timeout: config.write_timeout,
    });

    let app = nudge_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = config.bind().await?;
    info!("Nudge server listening on {}", listener.local_addr()?);

    let token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open WebSockets close on this, letting serve() drain.
            token.cancel();
        })
        .await?;

    shutdown.cancel();
    match tokio::time::timeout(config.shutdown_grace, scanner_task).await {
        Ok(Ok(())) => info!("Shutdown complete"),
        Ok(Err(e)) => error!("Scanner task failed: {}", e),
        Err(_) => warn!(
            "Scanner did not stop within {:?}, exiting anyway",
            config.shutdown_grace
        ),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
