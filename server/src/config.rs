use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub weather_api_key: String,
    pub port: u16,
    pub cache_ttl_current: u64,
    pub cache_ttl_forecast: u64,
    pub database_url: String,
    pub openweather_base_url: String,
    pub openweather_current_path: String,
    pub openweather_forecast_path: String,
    pub openweather_geocode_direct_path: String,
    pub openweather_geocode_reverse_path: String,
    pub upstream_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests don't
    /// have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default = |key: &str, default: &str| {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let weather_api_key = lookup("WEATHER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("WEATHER_API_KEY not set"))?;

        Ok(Config {
            weather_api_key,
            port: parse_or(&lookup, "PORT", 5050)?,
            cache_ttl_current: parse_or(&lookup, "CACHE_TTL_CURRENT", 0)?,
            cache_ttl_forecast: parse_or(&lookup, "CACHE_TTL_FORECAST", 0)?,
            database_url: or_default("DATABASE_URL", "sqlite:./data.db?mode=rwc"),
            openweather_base_url: or_default(
                "OPENWEATHER_BASE_URL",
                "https://api.openweathermap.org",
            ),
            openweather_current_path: or_default("OPENWEATHER_CURRENT_PATH", "/data/2.5/weather"),
            openweather_forecast_path: or_default(
                "OPENWEATHER_FORECAST_PATH",
                "/data/2.5/forecast",
            ),
            openweather_geocode_direct_path: or_default(
                "OPENWEATHER_GEOCODE_DIRECT_PATH",
                "/geo/1.0/direct",
            ),
            openweather_geocode_reverse_path: or_default(
                "OPENWEATHER_GEOCODE_REVERSE_PATH",
                "/geo/1.0/reverse",
            ),
            upstream_timeout_secs: parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", 5)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", key, raw, e)),
        _ => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration pointing every upstream path at `base_url`.
    pub fn for_tests(base_url: &str) -> Self {
        Config {
            weather_api_key: "test-key".to_string(),
            port: 0,
            cache_ttl_current: 600,
            cache_ttl_forecast: 1800,
            database_url: "sqlite::memory:".to_string(),
            openweather_base_url: base_url.to_string(),
            openweather_current_path: "/data/2.5/weather".to_string(),
            openweather_forecast_path: "/data/2.5/forecast".to_string(),
            openweather_geocode_direct_path: "/geo/1.0/direct".to_string(),
            openweather_geocode_reverse_path: "/geo/1.0/reverse".to_string(),
            upstream_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_fails() {
        let result = Config::from_lookup(lookup_from(&[("PORT", "8080")]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("WEATHER_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_fails() {
        let result = Config::from_lookup(lookup_from(&[("WEATHER_API_KEY", "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("WEATHER_API_KEY", "abc")])).unwrap();

        assert_eq!(config.weather_api_key, "abc");
        assert_eq!(config.port, 5050);
        assert_eq!(config.cache_ttl_current, 0);
        assert_eq!(config.cache_ttl_forecast, 0);
        assert_eq!(config.upstream_timeout_secs, 5);
        assert_eq!(config.openweather_base_url, "https://api.openweathermap.org");
        assert_eq!(config.openweather_current_path, "/data/2.5/weather");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("WEATHER_API_KEY", "abc"),
            ("PORT", "9000"),
            ("CACHE_TTL_CURRENT", "600"),
            ("CACHE_TTL_FORECAST", "1800"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.cache_ttl_current, 600);
        assert_eq!(config.cache_ttl_forecast, 1800);
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("WEATHER_API_KEY", "abc"),
            ("CACHE_TTL_CURRENT", "ten minutes"),
        ]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("CACHE_TTL_CURRENT"));
    }
}
