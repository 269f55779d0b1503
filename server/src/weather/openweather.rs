use super::types::*;
use crate::config::Config;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

const FORECAST_DAYS: usize = 5;
const GEOCODE_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum OpenWeatherError {
    #[error("{0}")]
    NotFound(String),
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("Response is missing {0}")]
    MissingField(&'static str),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Invalid coordinates")]
    InvalidCoordinates,
}

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Result<Self, OpenWeatherError> {
        let client = Client::builder()
            .user_agent("WeatherDashboard/1.0")
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, OpenWeatherError> {
        let url = self.url(&self.config.openweather_current_path);

        let response = self
            .get_json(&url, &[
                ("q", city),
                ("units", "metric"),
                ("appid", &self.config.weather_api_key),
            ])
            .await?;

        let current: CurrentWeatherResponse = serde_json::from_value(response)?;
        WeatherSnapshot::try_from(current)
    }

    pub async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastDay>, OpenWeatherError> {
        let url = self.url(&self.config.openweather_forecast_path);

        let response = self
            .get_json(&url, &[
                ("q", city),
                ("units", "metric"),
                ("appid", &self.config.weather_api_key),
            ])
            .await?;

        let forecast: ForecastResponse = serde_json::from_value(response)?;
        daily_forecast(&forecast)
    }

    /// Place-name suggestions. A blank query returns no suggestions without
    /// contacting the provider.
    pub async fn geocode(&self, query: &str) -> Result<Vec<GeoSuggestion>, OpenWeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url(&self.config.openweather_geocode_direct_path);
        let limit = GEOCODE_LIMIT.to_string();

        let response = self
            .get_json(&url, &[
                ("q", query),
                ("limit", &limit),
                ("appid", &self.config.weather_api_key),
            ])
            .await?;

        let places: Vec<GeocodeResponse> = serde_json::from_value(response)?;
        Ok(places
            .into_iter()
            .take(GEOCODE_LIMIT)
            .map(GeoSuggestion::from)
            .collect())
    }

    pub async fn reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Option<GeoSuggestion>, OpenWeatherError> {
        if !is_valid_coordinates(lat, lon) {
            return Err(OpenWeatherError::InvalidCoordinates);
        }

        let url = self.url(&self.config.openweather_geocode_reverse_path);

        let response = self
            .get_json(&url, &[
                ("lat", &lat.to_string()),
                ("lon", &lon.to_string()),
                ("limit", "1"),
                ("appid", &self.config.weather_api_key),
            ])
            .await?;

        let places: Vec<GeocodeResponse> = serde_json::from_value(response)?;
        Ok(places.into_iter().next().map(GeoSuggestion::from))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.openweather_base_url, path)
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, OpenWeatherError> {
        let response = self.client.get(url).query(params).send().await.map_err(|e| {
            tracing::warn!("OpenWeather request to {} failed: {}", url, e);
            e
        })?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let json: Value = response.json().await?;
                check_provider_code(&json)?;
                Ok(json)
            }
            reqwest::StatusCode::NOT_FOUND => {
                let body: Value = response.json().await.unwrap_or(Value::Null);
                Err(OpenWeatherError::NotFound(provider_message(&body)))
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                tracing::warn!("OpenWeather returned HTTP {}: {}", status, error_text);
                Err(OpenWeatherError::ApiError(format!(
                    "HTTP {}: {}",
                    status, error_text
                )))
            }
        }
    }
}

/// The provider echoes a `cod` in object bodies, as a number for current
/// weather and as a string for forecasts.
fn check_provider_code(body: &Value) -> Result<(), OpenWeatherError> {
    let code = match body.get("cod") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse::<u64>().ok(),
        _ => return Ok(()),
    };

    match code {
        Some(200) => Ok(()),
        Some(404) => Err(OpenWeatherError::NotFound(provider_message(body))),
        _ => Err(OpenWeatherError::ApiError(provider_message(body))),
    }
}

fn provider_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or("city not found")
        .to_string()
}

fn is_valid_coordinates(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

impl TryFrom<CurrentWeatherResponse> for WeatherSnapshot {
    type Error = OpenWeatherError;

    fn try_from(current: CurrentWeatherResponse) -> Result<Self, Self::Error> {
        let condition = current
            .weather
            .into_iter()
            .next()
            .ok_or(OpenWeatherError::MissingField("weather"))?
            .description;

        Ok(Self {
            city: current.name,
            temp: current.main.temp,
            feels_like: current.main.feels_like,
            condition,
            humidity: current.main.humidity,
            wind_speed: current.wind.speed,
            sunrise: current.sys.sunrise,
            sunset: current.sys.sunset,
        })
    }
}

/// Collapses the 3-hour timeline to one entry per local calendar day,
/// keeping the first entry seen for each day, at most five days.
pub fn daily_forecast(forecast: &ForecastResponse) -> Result<Vec<ForecastDay>, OpenWeatherError> {
    let offset = forecast
        .city
        .as_ref()
        .and_then(|c| c.timezone)
        .map(i64::from)
        .unwrap_or(0);

    let mut seen_days = HashSet::new();
    let mut days = Vec::with_capacity(FORECAST_DAYS);

    for item in &forecast.list {
        if days.len() == FORECAST_DAYS {
            break;
        }

        let local = item
            .dt
            .checked_add(offset)
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .ok_or(OpenWeatherError::MissingField("list.dt"))?;
        let date = local.format("%a %b %d %Y").to_string();
        if !seen_days.insert(date.clone()) {
            continue;
        }

        let condition = item
            .weather
            .first()
            .ok_or(OpenWeatherError::MissingField("list.weather"))?
            .description
            .clone();

        days.push(ForecastDay {
            date,
            temp: item.main.temp,
            condition,
            humidity: item.main.humidity,
            wind_speed: item.wind.speed,
            precipitation_probability: pop_percent(item.pop),
        });
    }

    Ok(days)
}

fn pop_percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}
