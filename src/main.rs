use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticket_service::cache::{MemoryTicketCache, RedisTicketCache, TicketCache};
use ticket_service::config::Config;
use ticket_service::handlers::AppState;
use ticket_service::payment::MockPaymentService;
use ticket_service::reservation::ReservationService;
use ticket_service::routes::create_routes;
use ticket_service::store::{MemoryTicketStore, PgTicketStore, TicketStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    config.warn_on_suspicious_settings();

    let store: Arc<dyn TicketStore> = match &config.database_url {
        Some(url) => {
            let store = PgTicketStore::connect(url, config.max_db_connections)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Successfully connected to database");
            Arc::new(store)
        }
        None => Arc::new(MemoryTicketStore::new()),
    };

    let cache: Arc<dyn TicketCache> = match &config.redis_url {
        Some(url) => {
            let cache = RedisTicketCache::new(url, config.cache)
                .await
                .context("Failed to connect to redis")?;
            cache.ping().await.context("Redis did not answer PING")?;
            tracing::info!("Successfully connected to redis");
            Arc::new(cache)
        }
        None => {
            tracing::info!("REDIS_URL not set, caching tickets in process");
            let cache = Arc::new(MemoryTicketCache::new(config.cache));
            spawn_cache_purger(Arc::clone(&cache), config.cache.seat_ttl);
            cache
        }
    };

    let tickets = ReservationService::new(store, cache, Arc::new(MockPaymentService::new()))
        .with_currency(config.payment_currency.clone());
    let app = create_routes(AppState::new(tickets), &config);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Ticket service listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Expired in-process entries are otherwise only dropped when read.
fn spawn_cache_purger(cache: Arc<MemoryTicketCache>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            cache.purge_expired();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Received shutdown signal, stopping the application");
}
