// Hookfeed API server
// Decision: Postgres when DATABASE_URL is set, in-memory store otherwise
// Decision: On SIGINT/SIGTERM the hub stops first so open live streams end and the server can drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hookfeed_api::{auth::AuthConfig, build_router, config::AppConfig, AppState};
use hookfeed_core::memory::InMemoryEventStore;
use hookfeed_core::{BroadcastHub, EventStore, HubConfig, HubHandle};
use hookfeed_storage::{create_db_event_store, Database};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long the hub task gets to finish after the server has drained
const HUB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hookfeed_api=debug,hookfeed_core=info,hookfeed_storage=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("hookfeed-api starting...");

    let config = AppConfig::from_env()?;

    // Initialize store
    let store: Arc<dyn EventStore> = match &config.database_url {
        Some(database_url) => {
            let db = Database::from_url(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            if config.run_migrations {
                db.migrate().await?;
            }
            Arc::new(create_db_event_store(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; events are lost on restart");
            Arc::new(InMemoryEventStore::new())
        }
    };

    let (hub, hub_task) = BroadcastHub::spawn(
        HubConfig::default().with_subscriber_capacity(config.hub_subscriber_capacity),
    );

    // Load authentication configuration
    let auth_config = AuthConfig::from_env();
    tracing::info!(mode = ?auth_config.mode, "Authentication configured");

    let state = AppState::new(store, hub.clone(), &config.webhook_secret, auth_config);
    let app = build_router(state, &config.frontend_url);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(hub))
    .await
    .context("Server error")?;

    if tokio::time::timeout(HUB_SHUTDOWN_TIMEOUT, hub_task)
        .await
        .is_err()
    {
        tracing::warn!("Broadcast hub did not stop in time");
    }

    tracing::info!("hookfeed-api stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM, after telling the hub to stop
async fn shutdown_signal(hub: HubHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    hub.shutdown();
}
