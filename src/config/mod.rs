use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub sweeper: SweeperConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// No URL means the in-memory store.
    pub url: Option<String>,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// No URL disables the hall layout cache.
    pub url: Option<String>,
    pub seat_cache_ttl_seconds: u64,
}

pub const MIN_SWEEP_INTERVAL_SECONDS: u64 = 1;
// Десять лет
pub const MAX_RETENTION_HOURS: i64 = 24 * 365 * 10;

// Фоновая очистка прошедших сеансов
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    pub interval_seconds: u64,
    pub retention_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                environment: "development".to_string(),
                rust_log: "cinema_booking=debug,tower_http=debug".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                pool_size: 20,
                acquire_timeout_seconds: 5,
            },
            redis: RedisConfig {
                url: None,
                seat_cache_ttl_seconds: 3600,
            },
            sweeper: SweeperConfig {
                interval_seconds: 3600,
                retention_hours: 5,
            },
            auth: AuthConfig {
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
        }
    }
}

/// Environment variable -> config key.
const ENV_KEYS: &[(&str, &str)] = &[
    ("HOST", "app.host"),
    ("PORT", "app.port"),
    ("ENVIRONMENT", "app.environment"),
    ("RUST_LOG", "app.rust_log"),
    ("DATABASE_URL", "database.url"),
    ("DB_POOL_SIZE", "database.pool_size"),
    ("DB_ACQUIRE_TIMEOUT_SECONDS", "database.acquire_timeout_seconds"),
    ("REDIS_URL", "redis.url"),
    ("SEAT_CACHE_TTL_SECONDS", "redis.seat_cache_ttl_seconds"),
    ("SWEEP_INTERVAL_SECONDS", "sweeper.interval_seconds"),
    ("SCREENING_RETENTION_HOURS", "sweeper.retention_hours"),
    ("BCRYPT_COST", "auth.bcrypt_cost"),
];

impl Config {
    /// Defaults overlaid with whatever of [`ENV_KEYS`] is set.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Config::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        for (name, key) in ENV_KEYS {
            let value = lookup(name).filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        let cfg: Config = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.sweeper.interval_seconds < MIN_SWEEP_INTERVAL_SECONDS {
            return Err(config::ConfigError::Message(format!(
                "SWEEP_INTERVAL_SECONDS must be at least {}",
                MIN_SWEEP_INTERVAL_SECONDS
            )));
        }
        if !(0..=MAX_RETENTION_HOURS).contains(&self.sweeper.retention_hours) {
            return Err(config::ConfigError::Message(format!(
                "SCREENING_RETENTION_HOURS must be between 0 and {}",
                MAX_RETENTION_HOURS
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(MIN_SWEEP_INTERVAL_SECONDS))
    }

    pub fn retention(&self) -> chrono::Duration {
        let hours = self.retention_hours.clamp(0, MAX_RETENTION_HOURS);
        chrono::Duration::try_hours(hours).unwrap_or(chrono::Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.app.port, 8000);
        assert!(cfg.database.url.is_none());
        assert!(cfg.redis.url.is_none());
        assert_eq!(cfg.sweeper.interval_seconds, 3600);
        assert_eq!(cfg.sweeper.retention(), chrono::Duration::hours(5));
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = Config::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("DATABASE_URL", "postgres://cinema@localhost/cinema"),
            ("SCREENING_RETENTION_HOURS", "6"),
            ("REDIS_URL", "  "),
        ]))
        .unwrap();

        assert_eq!(cfg.app.port, 9090);
        assert_eq!(cfg.database.url.as_deref(), Some("postgres://cinema@localhost/cinema"));
        assert_eq!(cfg.sweeper.retention_hours, 6);
        assert!(cfg.redis.url.is_none());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn invalid_number_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn sweeper_bounds_are_enforced() {
        assert!(Config::from_lookup(lookup(&[("SWEEP_INTERVAL_SECONDS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SCREENING_RETENTION_HOURS", "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[(
            "SCREENING_RETENTION_HOURS",
            "9223372036854775807"
        )]))
        .is_err());

        let cfg = Config::from_lookup(lookup(&[("SCREENING_RETENTION_HOURS", "0")])).unwrap();
        assert_eq!(cfg.sweeper.retention(), chrono::Duration::zero());

        let raw = SweeperConfig { interval_seconds: 0, retention_hours: i64::MAX };
        assert_eq!(raw.interval(), Duration::from_secs(1));
        assert_eq!(raw.retention(), chrono::Duration::hours(MAX_RETENTION_HOURS));
    }
}
