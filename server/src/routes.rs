use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::{
    cache::CacheGateway,
    config::Config,
    database::{CacheKind, Database},
    error::AppError,
    weather::{
        openweather::{OpenWeatherClient, OpenWeatherError},
        types::{ForecastDay, GeoSuggestion, WeatherSnapshot},
    },
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Arc<Database>,
    pub cache: Arc<CacheGateway>,
    pub weather_client: Arc<OpenWeatherClient>,
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: Option<String>,
}

/// Coordinates arrive as raw strings so a malformed value is a 400 with an
/// empty object rather than an extractor rejection. Handlers take their
/// queries as `Option<Query<_>>` for the same reason.
#[derive(Debug, Deserialize)]
pub struct ReverseQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub database: String,
}

fn required_city(city: Option<String>) -> Result<String, AppError> {
    city.map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("City is required".to_string()))
}

async fn current_weather(state: &AppState, city: &str) -> Result<WeatherSnapshot, AppError> {
    let client = &state.weather_client;
    state
        .cache
        .fetch_with_cache(
            CacheKind::Current,
            city,
            state.config.cache_ttl_current,
            |city| async move { client.fetch_current(&city).await.map_err(AppError::from) },
        )
        .await
}

// Route handlers
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match state.database.health_check().await {
        Ok(()) => ("healthy", StatusCode::OK, "ok".to_string()),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "unavailable".to_string())
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        }),
    )
}

pub async fn get_weather(
    State(state): State<AppState>,
    params: Option<Query<CityQuery>>,
) -> Result<Json<WeatherSnapshot>, AppError> {
    let city = required_city(params.and_then(|Query(p)| p.city))?;
    let snapshot = current_weather(&state, &city).await?;
    Ok(Json(snapshot))
}

pub async fn get_forecast(
    State(state): State<AppState>,
    params: Option<Query<CityQuery>>,
) -> Result<Json<Vec<ForecastDay>>, AppError> {
    let city = required_city(params.and_then(|Query(p)| p.city))?;
    let client = &state.weather_client;

    let days = state
        .cache
        .fetch_with_cache(
            CacheKind::Forecast,
            &city,
            state.config.cache_ttl_forecast,
            |city| async move { client.fetch_forecast(&city).await.map_err(AppError::from) },
        )
        .await?;

    Ok(Json(days))
}

pub async fn get_favorites(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let favorites = state.database.list_favorites().await?;
    Ok(Json(favorites))
}

/// Records a favorite only after its current weather resolves, which also
/// warms the cache for the dashboard's first render.
pub async fn add_favorite(
    State(state): State<AppState>,
    body: Option<Json<FavoriteRequest>>,
) -> Result<Json<SuccessResponse>, AppError> {
    let city = required_city(body.and_then(|Json(request)| request.city))?;

    if let Err(e) = current_weather(&state, &city).await {
        tracing::info!("Rejecting favorite {:?}: {}", city, e);
        return Err(AppError::Upstream(format!(
            "city {:?} failed weather validation: {}",
            city, e
        )));
    }

    state.database.add_favorite(&city).await?;
    tracing::info!("Added favorite {:?}", city);

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    body: Option<Json<FavoriteRequest>>,
) -> Result<Json<SuccessResponse>, AppError> {
    let city = required_city(body.and_then(|Json(request)| request.city))?;

    state.database.remove_favorite(&city).await?;
    tracing::info!("Removed favorite {:?}", city);

    Ok(Json(SuccessResponse { success: true }))
}

/// Suggestion lookups never fail loudly: errors become an empty list.
pub async fn geocode(
    State(state): State<AppState>,
    params: Option<Query<GeocodeQuery>>,
) -> (StatusCode, Json<Vec<GeoSuggestion>>) {
    let query = params.and_then(|Query(p)| p.q).unwrap_or_default();
    if query.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(Vec::new()));
    }

    match state.weather_client.geocode(&query).await {
        Ok(suggestions) => (StatusCode::OK, Json(suggestions)),
        Err(e) => {
            tracing::error!("Direct geocoding failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Vec::new()))
        }
    }
}

pub async fn reverse_geocode(
    State(state): State<AppState>,
    params: Option<Query<ReverseQuery>>,
) -> Response {
    let empty = || Json(json!({}));

    let Some(Query(params)) = params else {
        return (StatusCode::BAD_REQUEST, empty()).into_response();
    };
    let parse = |raw: Option<String>| raw.and_then(|v| v.trim().parse::<f64>().ok());
    let (Some(lat), Some(lon)) = (parse(params.lat), parse(params.lon)) else {
        return (StatusCode::BAD_REQUEST, empty()).into_response();
    };

    match state.weather_client.reverse_geocode(lat, lon).await {
        Ok(Some(place)) => Json(place).into_response(),
        Ok(None) => empty().into_response(),
        Err(OpenWeatherError::InvalidCoordinates) => {
            (StatusCode::BAD_REQUEST, empty()).into_response()
        }
        Err(e) => {
            tracing::error!("Reverse geocoding failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, empty()).into_response()
        }
    }
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather", get(get_weather))
        .route("/forecast", get(get_forecast))
        .route("/favorites", get(get_favorites))
        .route("/favorites/add", post(add_favorite))
        .route("/favorites/remove", post(remove_favorite))
        .route("/geocode", get(geocode))
        .route("/reverse", get(reverse_geocode))
        .with_state(state)
}
