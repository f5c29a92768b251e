pub mod api_client;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod openapi;
pub mod rate_limit;
pub mod redis_store;
pub mod service;
pub mod validation;

use axum::{Router, middleware, routing::get};
use common::errors::AppError;
use common::http_client::HttpClient;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api_client::VisualCrossingClient;
use crate::cache::{CacheStore, MemoryStore};
use crate::config::Config;
use crate::handlers::AppState;
use crate::rate_limit::{RateLimiter, rate_limit_middleware};
use crate::redis_store::RedisStore;
use crate::service::WeatherService;

/// Wires the cache store and upstream client described by `config`
pub fn build_service(config: &Config) -> Result<WeatherService, AppError> {
    let cache: Arc<dyn CacheStore> = if config.uses_memory_cache() {
        info!("Using in-process cache store");
        Arc::new(MemoryStore::new())
    } else {
        info!(timeout_ms = config.cache_timeout_ms, "Using Redis cache store");
        Arc::new(RedisStore::open(&config.redis_url, config.cache_timeout())?)
    };

    let http_client = HttpClient::new(config.upstream_timeout(), config.upstream_max_retries)?;
    let fetcher = Arc::new(VisualCrossingClient::new(
        http_client,
        config.weather_api_url.clone(),
        config.weather_api_key.clone(),
    ));

    Ok(WeatherService::new(cache, fetcher, config.cache_settings()))
}

/// Routes: rate limit → validate → orchestrate, with `AppError` as the single
/// error translation stage.
pub fn router(state: AppState, limiter: Arc<RateLimiter>) -> Router {
    let weather = Router::new()
        .route("/api/weather", get(handlers::get_weather))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(weather)
        .merge(openapi::swagger_ui())
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
