use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Current weather for a city, as cached and as returned to clients
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct WeatherRecord {
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
    pub conditions: String,
}

/// Where a retrieval result came from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Api,
}

/// Weather lookup response
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct RetrievalResult {
    pub source: Source,
    pub data: WeatherRecord,
}

impl RetrievalResult {
    pub fn from_cache(data: WeatherRecord) -> Self {
        Self {
            source: Source::Cache,
            data,
        }
    }

    pub fn from_api(data: WeatherRecord) -> Self {
        Self {
            source: Source::Api,
            data,
        }
    }
}

/// Uniform error body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}
