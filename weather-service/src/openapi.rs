use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use common::models::{ErrorBody, RetrievalResult, Source, WeatherRecord};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::get_weather,
    ),
    components(schemas(
        RetrievalResult,
        WeatherRecord,
        Source,
        ErrorBody,
    )),
    tags(
        (name = "weather", description = "Cached weather lookups"),
    ),
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
