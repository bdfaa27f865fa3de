use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::coordinator::DEFAULT_MAX_ATTEMPTS;
use crate::venue::{SeatMap, SeatMapError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
    #[error("VENUE_LAYOUT: {0}")]
    Venue(#[from] SeatMapError),
}

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub reservation: ReservationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

// Настройки базы данных. Без DATABASE_URL сервис работает на хранилищах в памяти
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
    pub seed_seats: bool,
}

// Настройки Redis (кеш списка мест). Без REDIS_URL кеш выключен
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub seats_ttl_seconds: u64,
}

// Настройки JWT и хеширования паролей
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub expires_in_hours: i64,
    pub bcrypt_cost: u32,
}

// Настройки бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationConfig {
    pub max_attempts: u32,
    /// Размеры рядов; `None` - стандартный зал.
    pub venue_layout: Option<Vec<i32>>,
}

impl ReservationConfig {
    pub fn seat_map(&self) -> Result<SeatMap, SeatMapError> {
        match &self.venue_layout {
            Some(sizes) => SeatMap::from_row_sizes(sizes),
            None => Ok(SeatMap::standard()),
        }
    }
}

fn var(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let venue_layout = match var("VENUE_LAYOUT") {
            Some(layout) => Some(
                SeatMap::parse(&layout)?
                    .layout()
                    .iter()
                    .map(|r| r.seat_count)
                    .collect(),
            ),
            None => None,
        };

        Ok(Config {
            app: AppConfig {
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or("PORT", 8000)?,
                environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
                rust_log: var("RUST_LOG")
                    .unwrap_or_else(|| "seat_reservation=debug,tower_http=debug".to_string()),
                log_format: parse_or("LOG_FORMAT", LogFormat::Pretty)?,
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL"),
                pool_size: parse_or("DB_POOL_SIZE", 20)?,
                seed_seats: parse_or("SEED_SEATS", true)?,
            },
            redis: RedisConfig {
                url: var("REDIS_URL"),
                seats_ttl_seconds: parse_or("SEATS_CACHE_TTL_SECONDS", 5)?,
            },
            auth: AuthConfig {
                jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
                expires_in_hours: parse_or("JWT_EXPIRES_IN_HOURS", 1)?,
                bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            },
            reservation: ReservationConfig {
                max_attempts: parse_or("RESERVATION_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
                venue_layout,
            },
        })
    }

    /// Конфигурация для тестов и локального запуска без окружения.
    pub fn for_tests() -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
                rust_log: "seat_reservation=debug".to_string(),
                log_format: LogFormat::Pretty,
            },
            database: DatabaseConfig {
                url: None,
                pool_size: 1,
                seed_seats: false,
            },
            redis: RedisConfig {
                url: None,
                seats_ttl_seconds: 5,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                expires_in_hours: 1,
                bcrypt_cost: 4,
            },
            reservation: ReservationConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                venue_layout: None,
            },
        }
    }
}
