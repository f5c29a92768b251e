//! Cache-aside retrieval of weather records.
//!
//! Lookup and population use the same key function, so a record written for
//! "Paris" is served to a later request for "PARIS". Cache failures are
//! logged and absorbed; only upstream failures reach the caller.
//!
//! Concurrent misses for the same cold key are not coalesced: each request
//! fetches upstream and writes the cache, and the last write wins.

use common::errors::{AppError, CacheError};
use common::models::{RetrievalResult, WeatherRecord};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::api_client::WeatherFetcher;
use crate::cache::CacheStore;
use crate::config::CacheSettings;
use crate::validation::WeatherQuery;

/// Cache key for a city name
pub fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

pub struct WeatherService {
    cache: Arc<dyn CacheStore>,
    fetcher: Arc<dyn WeatherFetcher>,
    settings: CacheSettings,
}

impl WeatherService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        fetcher: Arc<dyn WeatherFetcher>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            cache,
            fetcher,
            settings,
        }
    }

    #[instrument(skip(self, query), fields(city = %query.city()))]
    pub async fn get_weather(&self, query: &WeatherQuery) -> Result<RetrievalResult, AppError> {
        let cache_key = normalize_city(query.city());

        if let Some(record) = self.lookup(&cache_key).await {
            info!(cache_key = %cache_key, "Cache hit");
            return Ok(RetrievalResult::from_cache(record));
        }

        info!(cache_key = %cache_key, "Cache miss");
        let record = self.fetcher.fetch(query.city()).await?;

        self.populate(&cache_key, &record).await;

        Ok(RetrievalResult::from_api(record))
    }

    /// Returns a cached record, or `None` for a miss, an unreadable entry or
    /// an unavailable store.
    async fn lookup(&self, cache_key: &str) -> Option<WeatherRecord> {
        let payload = match self.cache.get(cache_key).await {
            Ok(payload) => payload?,
            Err(e) => {
                log_cache_failure("read", cache_key, &e);
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(cache_key = %cache_key, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    async fn populate(&self, cache_key: &str, record: &WeatherRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(cache_key = %cache_key, error = %e, "Could not serialize record for cache");
                return;
            }
        };

        match self
            .cache
            .set(cache_key, &payload, self.settings.ttl_seconds)
            .await
        {
            Ok(()) => debug!(
                cache_key = %cache_key,
                ttl_seconds = self.settings.ttl_seconds,
                "Cached record"
            ),
            Err(e) => log_cache_failure("write", cache_key, &e),
        }
    }
}

fn log_cache_failure(operation: &str, cache_key: &str, err: &CacheError) {
    warn!(
        operation,
        cache_key = %cache_key,
        error = %err,
        "Cache unavailable, continuing without it"
    );
}
