use common::errors::AppError;
use serde::Deserialize;
use utoipa::IntoParams;

pub const CITY_REQUIRED_MESSAGE: &str = "City query parameter is required";

/// Raw query parameters for `GET /api/weather`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherParams {
    /// City name, case-insensitive
    pub city: Option<String>,
}

/// A query whose city is known to be non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    city: String,
}

impl WeatherQuery {
    pub fn city(&self) -> &str {
        &self.city
    }
}

impl TryFrom<WeatherParams> for WeatherQuery {
    type Error = AppError;

    fn try_from(params: WeatherParams) -> Result<Self, Self::Error> {
        let city = params
            .city
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::validation(CITY_REQUIRED_MESSAGE))?;

        Ok(Self { city })
    }
}

pub fn validate(params: WeatherParams) -> Result<WeatherQuery, AppError> {
    WeatherQuery::try_from(params)
}
