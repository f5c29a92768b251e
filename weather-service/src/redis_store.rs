use async_trait::async_trait;
use common::errors::CacheError;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

use crate::cache::CacheStore;

/// Redis-backed store.
///
/// The connection is established on first use. A failed connect leaves the
/// cell empty, so the next call tries again.
pub struct RedisStore {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    timeout: Duration,
}

impl RedisStore {
    pub fn open(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| CacheError::Connection(e.to_string()))?;
                info!("Connected to Redis");
                Ok::<_, CacheError>(manager)
            })
            .await?;

        Ok(manager.clone())
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout.as_millis() as u64))?
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.get::<_, Option<String>>(key)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        })
        .await
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_urls() {
        assert!(matches!(
            RedisStore::open("not a redis url", Duration::from_millis(100)),
            Err(CacheError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_reports_an_error_instead_of_a_miss() {
        // Nothing listens on port 1.
        let store = RedisStore::open("redis://127.0.0.1:1", Duration::from_millis(500)).unwrap();

        assert!(store.get("paris").await.is_err());
        assert!(store.set("paris", "{}", 60).await.is_err());
    }
}
