use rollcall_attendance::AttendanceConfig;
use rollcall_cache::CacheConfig;
use rollcall_database::DatabaseConfig;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown STORAGE_BACKEND '{0}' (expected 'postgres' or 'memory')")]
    UnknownStorageBackend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownStorageBackend(other.to_string())),
        }
    }
}

/// Knobs the HTTP layer reads per request.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Verification attempts allowed per (session, student) per window.
    pub verify_rate_limit: u32,
    pub verify_rate_window_seconds: u64,
    pub records_cache_ttl_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            verify_rate_limit: 10,
            verify_rate_window_seconds: 60,
            records_cache_ttl_seconds: 5,
        }
    }
}

impl ApiSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            verify_rate_limit: env_parse("VERIFY_RATE_LIMIT").unwrap_or(defaults.verify_rate_limit),
            verify_rate_window_seconds: env_parse("VERIFY_RATE_WINDOW_SECONDS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.verify_rate_window_seconds),
            records_cache_ttl_seconds: env_parse("RECORDS_CACHE_TTL_SECONDS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.records_cache_ttl_seconds),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub storage_backend: StorageBackend,
    pub database: DatabaseConfig,
    pub cache: Option<CacheConfig>,
    pub attendance: AttendanceConfig,
    pub api: ApiSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage_backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Postgres,
        };

        Ok(Self {
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            storage_backend,
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            attendance: AttendanceConfig::from_env(),
            api: ApiSettings::from_env(),
        })
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!(" Memory ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!(matches!(
            "sqlite".parse::<StorageBackend>(),
            Err(ConfigError::UnknownStorageBackend(ref name)) if name == "sqlite"
        ));
    }

    #[test]
    fn test_api_settings_defaults() {
        let settings = ApiSettings::default();
        assert_eq!(settings.verify_rate_limit, 10);
        assert_eq!(settings.verify_rate_window_seconds, 60);
        assert_eq!(settings.records_cache_ttl_seconds, 5);
    }
}
