use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use quiz_persistence::connection::DEFAULT_DATABASE_URL;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name}={value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("JWT_SECRET must be set unless AUTH_DEV_MODE is enabled")]
    MissingJwtSecret,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub poll_interval: Duration,
    pub max_attempts: i32,
    pub retry_backoff: Duration,
    pub retention: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            poll_interval: Duration::from_millis(500),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(1000),
            retention: Duration::from_secs(24 * 3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub scheduler: SchedulerConfig,
    pub lock_retry_attempts: u32,
    pub broadcast_capacity: usize,
    pub leaderboard_on_answer: bool,
    pub auth_dev_mode: bool,
    pub jwt_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key/value source; unset keys take their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let scheduler = SchedulerConfig {
            workers: parse_var(&lookup, "SCHEDULER_WORKERS", 2)?,
            poll_interval: Duration::from_millis(parse_var(
                &lookup,
                "SCHEDULER_POLL_INTERVAL_MS",
                500,
            )?),
            max_attempts: parse_var(&lookup, "JOB_MAX_ATTEMPTS", 3)?,
            retry_backoff: Duration::from_millis(parse_var(&lookup, "JOB_RETRY_BACKOFF_MS", 1000)?),
            retention: Duration::from_secs(
                parse_var::<u64>(&lookup, "JOB_RETENTION_HOURS", 24)? * 3600,
            ),
        };
        if scheduler.workers == 0 {
            return Err(invalid("SCHEDULER_WORKERS", "0", "at least one worker is required"));
        }
        if scheduler.max_attempts < 1 {
            return Err(invalid(
                "JOB_MAX_ATTEMPTS",
                &scheduler.max_attempts.to_string(),
                "must be at least 1",
            ));
        }

        let broadcast_capacity = parse_var(&lookup, "BROADCAST_CAPACITY", 64)?;
        if broadcast_capacity == 0 {
            return Err(invalid("BROADCAST_CAPACITY", "0", "must be at least 1"));
        }

        let auth_dev_mode = parse_flag(&lookup, "AUTH_DEV_MODE")?;
        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty());
        if !auth_dev_mode && jwt_secret.is_none() {
            return Err(ConfigError::MissingJwtSecret);
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&lookup, "PORT", 8080)?,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            scheduler,
            lock_retry_attempts: parse_var(&lookup, "LOCK_RETRY_ATTEMPTS", 3)?,
            broadcast_capacity,
            leaderboard_on_answer: parse_flag(&lookup, "LEADERBOARD_ON_ANSWER")?,
            auth_dev_mode,
            jwt_secret,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            scheduler: SchedulerConfig::default(),
            lock_retry_attempts: 3,
            broadcast_capacity: 64,
            leaderboard_on_answer: false,
            auth_dev_mode: true,
            jwt_secret: None,
        }
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, &raw, &e.to_string())),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<bool, ConfigError> {
    match lookup(name).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some("false") | Some("0") | Some("no") => Ok(false),
        Some(other) => Err(invalid(name, other, "expected true or false")),
    }
}
