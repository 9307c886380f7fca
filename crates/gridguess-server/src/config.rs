//! Server configuration from environment variables.

use anyhow::{bail, Context, Result};
use gridguess_core::{DEFAULT_MAX_ATTEMPTS, DEFAULT_REFERENCE_YEAR};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub energy_csv: PathBuf,
    pub coordinates_csv: PathBuf,
    pub reference_year: i32,
    pub max_attempts: u32,
    /// Idle time after which a session is discarded
    pub session_ttl: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            addr: parse_or(&lookup, "SERVER_ADDR", "0.0.0.0:8080".parse()?)?,
            energy_csv: lookup("ENERGY_DATA_CSV")
                .unwrap_or_else(|| "data/owid-energy-data.csv".into())
                .into(),
            coordinates_csv: lookup("COORDINATES_CSV")
                .unwrap_or_else(|| "data/coordinates_all_countries.csv".into())
                .into(),
            reference_year: parse_or(&lookup, "REFERENCE_YEAR", DEFAULT_REFERENCE_YEAR)?,
            max_attempts: parse_or(&lookup, "MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            session_ttl: Duration::from_secs(parse_or(&lookup, "SESSION_TTL_SECS", 1800u64)?),
        };

        if config.max_attempts == 0 {
            bail!("MAX_ATTEMPTS must be at least 1");
        }
        if config.session_ttl.is_zero() {
            bail!("SESSION_TTL_SECS must be at least 1");
        }
        Ok(config)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
