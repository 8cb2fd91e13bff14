use redis::{aio::ConnectionManager, Client};
use tracing::info;

/// Shared Redis handle. `ConnectionManager` reconnects on its own, so clones
/// are cheap and can outlive a dropped connection.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        info!("Redis connected");
        Ok(RedisClient { conn })
    }
}
