use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::cache::{CacheSettings, DEFAULT_SEAT_TTL, DEFAULT_TICKET_TTL};
use crate::reservation::DEFAULT_CURRENCY;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL; without it tickets live in process memory.
    pub database_url: Option<String>,
    pub max_db_connections: u32,
    /// Redis URL; without it the cache lives in process memory.
    pub redis_url: Option<String>,
    pub cache: CacheSettings,
    pub payment_currency: String,
    pub bind_addr: SocketAddr,
    pub cors_allowed_origins: Option<String>,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_addr = parse(
            "BIND_ADDR",
            var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;
        let max_db_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse("DATABASE_MAX_CONNECTIONS", raw)?,
            None => DEFAULT_MAX_DB_CONNECTIONS,
        };
        let cache = CacheSettings {
            ticket_ttl: ttl("CACHE_TTL_SECS", var("CACHE_TTL_SECS"), DEFAULT_TICKET_TTL)?,
            seat_ttl: ttl("SEAT_CACHE_TTL_SECS", var("SEAT_CACHE_TTL_SECS"), DEFAULT_SEAT_TTL)?,
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            max_db_connections,
            redis_url: var("REDIS_URL"),
            cache,
            payment_currency: var("PAYMENT_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            bind_addr,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS"),
            production: var("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        })
    }

    /// Logs settings that are legal but probably unintended.
    pub fn warn_on_suspicious_settings(&self) {
        if self.cache.seat_ttl >= self.cache.ticket_ttl {
            tracing::warn!(
                seat_ttl_secs = self.cache.seat_ttl.as_secs(),
                ticket_ttl_secs = self.cache.ticket_ttl.as_secs(),
                "Seat availability TTL is not shorter than the ticket TTL"
            );
        }
        if self.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set, tickets will not survive a restart");
        }
    }
}

fn parse<T>(name: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn ttl(name: &'static str, raw: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let secs: u64 = parse(name, raw.clone())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: raw,
            reason: "TTL must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
