use redis::aio::ConnectionManager;
use tokio::time::{timeout, Duration};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect to the optional campus-list cache.
/// `Ok(None)` means `REDIS_URL` is unset and the API runs uncached.
pub async fn get_redis() -> anyhow::Result<Option<ConnectionManager>> {
    let Some(redis_url) = std::env::var("REDIS_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
    else {
        return Ok(None);
    };

    let client = redis::Client::open(redis_url)?;
    let manager = timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 5 seconds"))??;

    Ok(Some(manager))
}
