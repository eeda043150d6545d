//! Application configuration
//!
//! Everything is read from the environment once at startup. Invalid values
//! are fatal: the server refuses to start rather than run with a
//! half-understood configuration.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Total messages per conversation (opener included)
pub const DEFAULT_MAX_MESSAGES: u32 = 20;
/// Backend calls a single session may make per reset window
pub const DEFAULT_MAX_CALLS_PER_DAY: u32 = 1000;
pub const DEFAULT_REPLY_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_EVALUATION_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_PORT: u16 = 8000;
/// Idle time after which the server forgets a session
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Fatal configuration problems
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Scenario catalog is empty")]
    EmptyCatalog,
    #[error("max_messages must be a positive even number, got {0}")]
    InvalidMaxMessages(u32),
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime settings for the server and the dialogue driver
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub max_messages: u32,
    pub max_calls_per_day: u32,
    pub reply_temperature: f32,
    pub evaluation_temperature: f32,
    pub turn_timeout: Duration,
    pub session_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: DEFAULT_PORT,
            max_messages: DEFAULT_MAX_MESSAGES,
            max_calls_per_day: DEFAULT_MAX_CALLS_PER_DAY,
            reply_temperature: DEFAULT_REPLY_TEMPERATURE,
            evaluation_temperature: DEFAULT_EVALUATION_TEMPERATURE,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            db_path: lookup("REVEAL_DB_PATH").map_or(defaults.db_path, PathBuf::from),
            port: parse_var(&lookup, "REVEAL_PORT")?.unwrap_or(defaults.port),
            max_messages: parse_var(&lookup, "REVEAL_MAX_MESSAGES")?
                .unwrap_or(defaults.max_messages),
            max_calls_per_day: parse_var(&lookup, "REVEAL_MAX_CALLS_PER_DAY")?
                .unwrap_or(defaults.max_calls_per_day),
            reply_temperature: parse_temperature(&lookup, "REVEAL_REPLY_TEMPERATURE")?
                .unwrap_or(defaults.reply_temperature),
            evaluation_temperature: parse_temperature(&lookup, "REVEAL_EVALUATION_TEMPERATURE")?
                .unwrap_or(defaults.evaluation_temperature),
            turn_timeout: parse_var::<u64, _>(&lookup, "REVEAL_TURN_TIMEOUT_SECS")?
                .map_or(defaults.turn_timeout, Duration::from_secs),
            session_ttl: parse_var::<u64, _>(&lookup, "REVEAL_SESSION_TTL_SECS")?
                .map_or(defaults.session_ttl, Duration::from_secs),
        };
        validate_max_messages(config.max_messages)?;
        Ok(config)
    }
}

/// `max_messages` must split evenly between the two parties
pub fn validate_max_messages(max_messages: u32) -> Result<(), ConfigError> {
    if max_messages == 0 || max_messages % 2 != 0 {
        return Err(ConfigError::InvalidMaxMessages(max_messages));
    }
    Ok(())
}

fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(format!("{home}/.reveal-chat/reveal.db"))
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}

fn parse_temperature<F>(lookup: &F, name: &'static str) -> Result<Option<f32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let parsed: Option<f32> = parse_var(lookup, name)?;
    match parsed {
        Some(t) if !(0.0..=2.0).contains(&t) => Err(ConfigError::InvalidValue {
            name,
            value: t.to_string(),
        }),
        other => Ok(other),
    }
}
