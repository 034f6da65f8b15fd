use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};

use crate::app::ExecutorConfig;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_VOTE_TX_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub database_max_connections: u32,
    /// Upper bound on a single vote transaction attempt
    pub vote_tx_timeout: Duration,
    pub cache_ttl: Duration,
    pub side_effects: ExecutorConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = ExecutorConfig::default();

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            vote_tx_timeout: Duration::from_millis(parse_nonzero_or(
                &lookup,
                "VOTE_TX_TIMEOUT_MS",
                DEFAULT_VOTE_TX_TIMEOUT_MS,
            )?),
            cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            side_effects: ExecutorConfig {
                queue_capacity: parse_or(
                    &lookup,
                    "SIDE_EFFECT_QUEUE_CAPACITY",
                    defaults.queue_capacity,
                )?,
                concurrency: parse_or(&lookup, "SIDE_EFFECT_CONCURRENCY", defaults.concurrency)?,
                max_attempts: parse_or(&lookup, "SIDE_EFFECT_MAX_ATTEMPTS", defaults.max_attempts)?,
                effect_timeout: Duration::from_millis(parse_nonzero_or(
                    &lookup,
                    "SIDE_EFFECT_TIMEOUT_MS",
                    defaults.effect_timeout.as_millis() as u64,
                )?),
                ..defaults
            },
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

/// Like `parse_or`, for timeouts where zero would fail every operation.
fn parse_nonzero_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> anyhow::Result<u64> {
    let value = parse_or(lookup, key, default)?;
    if value == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(value)
}
