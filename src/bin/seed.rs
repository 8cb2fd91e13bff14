//! Loads the demo catalog (cinemas, halls, seats, movies, screenings) into
//! the configured Postgres database.

use anyhow::Context;
use chrono::Utc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    cache::CacheService, config::Config, database::Database, redis_client::RedisClient,
    services::catalog::seed_demo_catalog, store::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL must be set to seed the catalog")?;

    let db = Database::connect(url, &config.database).await?;
    db.run_migrations().await?;

    let store = PgStore::new(&db);
    let summary = seed_demo_catalog(&store, Utc::now().date_naive(), config.auth.bcrypt_cost).await?;

    // Hall ids may repeat after a database reset
    if let Some(redis_url) = config.redis.url.as_deref() {
        let redis = RedisClient::connect(redis_url).await?;
        let cache = CacheService::new(redis, config.redis.seat_cache_ttl_seconds);
        for hall_id in &summary.halls {
            cache.invalidate_hall(*hall_id).await;
        }
    }

    info!("Seeding finished: {:?}", summary);
    Ok(())
}
