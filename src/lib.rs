pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use chrono::Utc;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::store::{BookingStore, MemoryStore, PgStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub cache: Option<cache::CacheService>,
    pub config: config::Config,
}

impl AppState {
    /// Connects the configured backends. Without `DATABASE_URL` the service
    /// runs on an in-memory store loaded with the demo catalog.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn BookingStore> = match config.database.url.as_deref() {
            Some(url) => {
                let db = database::Database::connect(url, &config.database).await?;
                info!("Database connected");
                db.run_migrations().await?;
                Arc::new(PgStore::new(&db))
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory store with demo data");
                let memory = MemoryStore::new();
                services::catalog::seed_demo_catalog(
                    &memory,
                    Utc::now().date_naive(),
                    config.auth.bcrypt_cost,
                )
                .await?;
                Arc::new(memory)
            }
        };

        let cache = match config.redis.url.as_deref() {
            Some(url) => {
                let redis = redis_client::RedisClient::connect(url).await?;
                Some(cache::CacheService::new(redis, config.redis.seat_cache_ttl_seconds))
            }
            None => None,
        };

        Ok(Arc::new(Self { store, cache, config }))
    }

    pub fn with_store(store: Arc<dyn BookingStore>, config: config::Config) -> Arc<Self> {
        Arc::new(Self { store, cache: None, config })
    }
}

/// Full HTTP surface of the service.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
