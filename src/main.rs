use sqlx::postgres::PgPoolOptions;
use std::io::{Error, ErrorKind};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use staff_auth::cache::{CacheStore, InMemoryCache, RedisCache};
use staff_auth::configuration::{get_configuration, CacheBackendKind, CacheSettings};
use staff_auth::startup::{run, AppServices};
use staff_auth::store::PgUserStore;
use staff_auth::telemetry::init_telemetry;

fn startup_error(kind: ErrorKind, message: &str) -> Error {
    Error::new(kind, message.to_string())
}

/// Redis when configured; an unreachable server is logged and reads fall
/// through to Postgres until it comes back.
async fn build_cache(settings: &CacheSettings) -> std::io::Result<Arc<dyn CacheStore>> {
    match settings.backend {
        CacheBackendKind::Redis => {
            let redis = RedisCache::from_url(&settings.redis_url).map_err(|e| {
                tracing::error!(error = %e, "Invalid Redis configuration");
                startup_error(ErrorKind::InvalidInput, "Cache configuration error")
            })?;
            match redis.ping().await {
                Ok(()) => tracing::info!("Connected to Redis"),
                Err(e) => tracing::warn!(error = %e, "Redis unavailable, continuing without caching"),
            }
            Ok(Arc::new(redis))
        }
        CacheBackendKind::Memory => {
            tracing::info!("Using in-process cache");
            Ok(Arc::new(InMemoryCache::new()))
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!(error = %e, "Failed to read configuration");
        startup_error(ErrorKind::InvalidInput, "Configuration error")
    })?;

    configuration.validate().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        startup_error(ErrorKind::InvalidInput, "Configuration error")
    })?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create connection pool");
            startup_error(ErrorKind::ConnectionRefused, "Database connection error")
        })?;
    tracing::info!("Database connection pool created successfully");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations");
            startup_error(ErrorKind::Other, "Database migration error")
        })?;

    let cache = build_cache(&configuration.cache).await?;
    let store = Arc::new(PgUserStore::new(pool.clone()));

    let services = AppServices::build(&configuration, store, cache).map_err(|e| {
        tracing::error!(error = %e, "Failed to build services");
        startup_error(ErrorKind::InvalidInput, "Configuration error")
    })?;

    services.bootstrap_admin(&configuration).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to bootstrap administrator");
        startup_error(ErrorKind::InvalidInput, "Administrator bootstrap error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    let server = run(listener, services)?;
    let result = server.await;

    tracing::info!("Server stopped, closing database pool");
    pool.close().await;

    result
}
