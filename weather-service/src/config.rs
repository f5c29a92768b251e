use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WEATHER_API_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

/// Selects the in-process cache store instead of Redis
pub const MEMORY_CACHE_URL: &str = "memory";

/// One year
pub const MAX_CACHE_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;
pub const MAX_UPSTREAM_RETRIES: u32 = 10;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a positive integer within range, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub weather_api_url: String,
    pub weather_api_key: String,
    pub cache_ttl_seconds: u64,
    pub redis_url: String,
    pub cache_timeout_ms: u64,
    pub upstream_timeout_secs: u64,
    pub upstream_max_retries: u32,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub log_json: bool,
}

/// Settings handed to the orchestrator at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let weather_api_key = lookup("WEATHER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("WEATHER_API_KEY"))?;

        Ok(Self {
            port: positive(&lookup, "PORT", 3000)?,
            weather_api_url: lookup("WEATHER_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_WEATHER_API_URL.to_string()),
            weather_api_key,
            cache_ttl_seconds: at_most(
                positive(&lookup, "CACHE_TTL", 3600)?,
                "CACHE_TTL",
                MAX_CACHE_TTL_SECONDS,
            )?,
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            cache_timeout_ms: positive(&lookup, "CACHE_TIMEOUT_MS", 500)?,
            upstream_timeout_secs: positive(&lookup, "UPSTREAM_TIMEOUT_SECS", 5)?,
            upstream_max_retries: at_most(
                non_negative(&lookup, "UPSTREAM_MAX_RETRIES", 0)?,
                "UPSTREAM_MAX_RETRIES",
                MAX_UPSTREAM_RETRIES,
            )?,
            rate_limit_max_requests: positive(&lookup, "RATE_LIMIT_MAX", 100)?,
            rate_limit_window_secs: positive(&lookup, "RATE_LIMIT_WINDOW_SECS", 900)?,
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            ttl_seconds: self.cache_ttl_seconds,
        }
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn uses_memory_cache(&self) -> bool {
        self.redis_url.eq_ignore_ascii_case(MEMORY_CACHE_URL)
    }
}

fn non_negative<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

fn positive<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
{
    let value = non_negative(lookup, name, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidNumber {
            name,
            value: "0".to_string(),
        });
    }
    Ok(value)
}

fn at_most<T>(value: T, name: &'static str, max: T) -> Result<T, ConfigError>
where
    T: PartialOrd + ToString,
{
    if value > max {
        return Err(ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = config_from(&[("WEATHER_API_KEY", "secret")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.cache_ttl_seconds, 3600);
        assert_eq!(config.weather_api_url, DEFAULT_WEATHER_API_URL);
        assert_eq!(config.upstream_max_retries, 0);
        assert!(!config.uses_memory_cache());
        assert!(!config.log_json);
    }

    #[test]
    fn missing_api_key_is_fatal() {
        assert_eq!(
            config_from(&[]).unwrap_err(),
            ConfigError::Missing("WEATHER_API_KEY")
        );
        assert_eq!(
            config_from(&[("WEATHER_API_KEY", "  ")]).unwrap_err(),
            ConfigError::Missing("WEATHER_API_KEY")
        );
    }

    #[test]
    fn malformed_ttl_is_fatal() {
        let err = config_from(&[("WEATHER_API_KEY", "k"), ("CACHE_TTL", "ten minutes")])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: "CACHE_TTL",
                value: "ten minutes".to_string()
            }
        );
    }

    #[test]
    fn zero_ttl_is_fatal() {
        assert!(config_from(&[("WEATHER_API_KEY", "k"), ("CACHE_TTL", "0")]).is_err());
        assert!(config_from(&[("WEATHER_API_KEY", "k"), ("CACHE_TTL", "-5")]).is_err());
    }

    #[test]
    fn ttl_above_one_year_is_fatal() {
        let err = config_from(&[
            ("WEATHER_API_KEY", "k"),
            ("CACHE_TTL", "18446744073709551615"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: "CACHE_TTL",
                value: u64::MAX.to_string()
            }
        );

        let too_long = (MAX_CACHE_TTL_SECONDS + 1).to_string();
        assert!(config_from(&[("WEATHER_API_KEY", "k"), ("CACHE_TTL", too_long.as_str())]).is_err());
    }

    #[test]
    fn ttl_at_the_upper_bound_is_accepted() {
        let max = MAX_CACHE_TTL_SECONDS.to_string();
        let config = config_from(&[("WEATHER_API_KEY", "k"), ("CACHE_TTL", max.as_str())]).unwrap();
        assert_eq!(config.cache_ttl_seconds, MAX_CACHE_TTL_SECONDS);
    }

    #[test]
    fn retries_are_capped() {
        let config =
            config_from(&[("WEATHER_API_KEY", "k"), ("UPSTREAM_MAX_RETRIES", "10")]).unwrap();
        assert_eq!(config.upstream_max_retries, MAX_UPSTREAM_RETRIES);

        let err = config_from(&[("WEATHER_API_KEY", "k"), ("UPSTREAM_MAX_RETRIES", "64")])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: "UPSTREAM_MAX_RETRIES",
                value: "64".to_string()
            }
        );
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("WEATHER_API_KEY", "k"),
            ("CACHE_TTL", " 600 "),
            ("WEATHER_API_URL", "http://localhost:9000/timeline/"),
            ("REDIS_URL", "memory"),
            ("UPSTREAM_MAX_RETRIES", "0"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.cache_settings(), CacheSettings { ttl_seconds: 600 });
        assert_eq!(config.weather_api_url, "http://localhost:9000/timeline");
        assert!(config.uses_memory_cache());
        assert!(config.log_json);
    }
}
