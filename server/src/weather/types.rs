use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Normalized data served to the dashboard

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub temp: f64,
    pub feels_like: f64,
    pub condition: String,
    pub humidity: f64,
    #[serde(rename = "wind")]
    pub wind_speed: f64,
    /// Epoch seconds.
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Calendar day in the city's local time, e.g. "Mon Oct 19 2026".
    pub date: String,
    pub temp: f64,
    pub condition: String,
    pub humidity: f64,
    #[serde(rename = "wind")]
    pub wind_speed: f64,
    /// Precipitation probability, 0-100.
    #[serde(rename = "pop")]
    pub precipitation_probability: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSuggestion {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

// OpenWeather response shapes

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherResponse {
    pub name: String,
    pub main: CurrentMain,
    pub weather: Vec<WeatherCondition>,
    pub wind: Wind,
    pub sys: CurrentSys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentSys {
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: Option<i32>,
    pub main: Option<String>,
    pub description: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: Option<f64>,
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub list: Vec<ForecastItem>,
    pub city: Option<ForecastCity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastItem {
    pub dt: i64,
    pub main: ForecastMain,
    pub weather: Vec<WeatherCondition>,
    pub wind: Wind,
    #[serde(default)]
    pub pop: f64,
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastMain {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: Option<String>,
    pub country: Option<String>,
    /// Shift from UTC in seconds.
    pub timezone: Option<i32>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub name: String,
    pub local_names: Option<HashMap<String, String>>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: String,
    pub state: Option<String>,
}

impl From<GeocodeResponse> for GeoSuggestion {
    fn from(place: GeocodeResponse) -> Self {
        Self {
            name: place.name,
            country: place.country,
            lat: place.lat,
            lon: place.lon,
            state: place.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = WeatherSnapshot {
            city: "Tokyo".to_string(),
            temp: 18.5,
            feels_like: 17.9,
            condition: "light rain".to_string(),
            humidity: 81.0,
            wind_speed: 3.6,
            sunrise: 1_760_821_000,
            sunset: 1_760_861_000,
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["wind"], json!(3.6));
        assert_eq!(value["feels_like"], json!(17.9));
        assert!(value.get("wind_speed").is_none());
    }

    #[test]
    fn test_forecast_day_wire_format() {
        let day = ForecastDay {
            date: "Mon Oct 19 2026".to_string(),
            temp: 12.0,
            condition: "clear sky".to_string(),
            humidity: 40.0,
            wind_speed: 1.2,
            precipitation_probability: 42,
        };

        let value = serde_json::to_value(&day).unwrap();
        assert_eq!(value["pop"], json!(42));
        assert_eq!(value["wind"], json!(1.2));
    }

    #[test]
    fn test_geo_suggestion_omits_missing_state() {
        let place: GeocodeResponse = serde_json::from_value(json!({
            "name": "Lima",
            "lat": -12.06,
            "lon": -77.04,
            "country": "PE"
        }))
        .unwrap();

        let value = serde_json::to_value(GeoSuggestion::from(place)).unwrap();
        assert_eq!(
            value,
            json!({ "name": "Lima", "country": "PE", "lat": -12.06, "lon": -77.04 })
        );
    }
}
