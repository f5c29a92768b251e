use async_trait::async_trait;
use common::errors::UpstreamError;
use common::http_client::HttpClient;
use common::models::WeatherRecord;
use serde::Deserialize;
use tracing::{info, instrument};

/// Source of fresh weather data. Implementations never touch the cache.
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord, UpstreamError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineResponse {
    resolved_address: String,
    current_conditions: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temp: f64,
    humidity: f64,
    conditions: String,
}

impl From<TimelineResponse> for WeatherRecord {
    fn from(response: TimelineResponse) -> Self {
        Self {
            city: response.resolved_address,
            temperature: response.current_conditions.temp,
            humidity: response.current_conditions.humidity,
            conditions: response.current_conditions.conditions,
        }
    }
}

/// Client for the Visual Crossing timeline API
pub struct VisualCrossingClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl VisualCrossingClient {
    pub fn new(http_client: HttpClient, base_url: String, api_key: String) -> Self {
        Self {
            http_client,
            base_url,
            api_key,
        }
    }

    fn timeline_url(&self, city: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(city))
    }
}

#[async_trait]
impl WeatherFetcher for VisualCrossingClient {
    #[instrument(skip(self), fields(city = %city))]
    async fn fetch(&self, city: &str) -> Result<WeatherRecord, UpstreamError> {
        info!("Fetching weather from provider");

        let url = self.timeline_url(city);
        let query = [
            ("key", self.api_key.as_str()),
            ("include", "current"),
            ("contentType", "json"),
        ];

        let response: TimelineResponse = self.http_client.get_json(&url, &query).await?;

        Ok(response.into())
    }
}
