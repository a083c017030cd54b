use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use shared::models::{default_nominees, Nominee};
use thiserror::Error;

const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_VOTE_RATE_LIMIT: u32 = 10;
const DEFAULT_VOTE_RATE_WINDOW_SECS: u64 = 60;
const DEFAULT_COUNTDOWN_DAYS: i64 = 6;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("NOMINEES entry {0:?} is not of the form id:name")]
    MalformedNominee(String),
    #[error("NOMINEES lists id {0} more than once")]
    DuplicateNominee(u32),
    #[error("NOMINEES must name at least one nominee")]
    NoNominees,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub nominees: Vec<Nominee>,
    pub admin_token: Option<String>,
    pub store_timeout: Duration,
    pub vote_rate_limit: u32,
    pub vote_rate_window: Duration,
    pub countdown_days: i64,
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nominees: default_nominees(),
            admin_token: None,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            vote_rate_limit: DEFAULT_VOTE_RATE_LIMIT,
            vote_rate_window: Duration::from_secs(DEFAULT_VOTE_RATE_WINDOW_SECS),
            countdown_days: DEFAULT_COUNTDOWN_DAYS,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}

impl Config {
    /// Builds the configuration from a key lookup, such as Shuttle's secret
    /// store. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(raw) = lookup("NOMINEES") {
            config.nominees = parse_nominees(&raw)?;
        }
        config.admin_token = lookup("ADMIN_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        if let Some(raw) = lookup("STORE_TIMEOUT_MS") {
            let millis: u64 = parse_number("STORE_TIMEOUT_MS", raw.clone())?;
            if millis == 0 {
                return Err(ConfigError::InvalidValue { key: "STORE_TIMEOUT_MS", value: raw });
            }
            config.store_timeout = Duration::from_millis(millis);
        }
        if let Some(raw) = lookup("VOTE_RATE_LIMIT") {
            config.vote_rate_limit = parse_number("VOTE_RATE_LIMIT", raw)?;
        }
        if let Some(raw) = lookup("VOTE_RATE_WINDOW_SECS") {
            config.vote_rate_window = Duration::from_secs(parse_number("VOTE_RATE_WINDOW_SECS", raw)?);
        }
        if let Some(raw) = lookup("COUNTDOWN_DAYS") {
            let days: i64 = parse_number("COUNTDOWN_DAYS", raw.clone())?;
            if days <= 0 {
                return Err(ConfigError::InvalidValue { key: "COUNTDOWN_DAYS", value: raw });
            }
            config.countdown_days = days;
        }
        if let Some(raw) = lookup("ALLOWED_ORIGINS") {
            config.allowed_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }
}

/// Parses `1:Moon Studio Animation,2:Seel`.
pub fn parse_nominees(raw: &str) -> Result<Vec<Nominee>, ConfigError> {
    let mut seen = HashSet::new();
    let mut nominees = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, name) = entry
            .split_once(':')
            .ok_or_else(|| ConfigError::MalformedNominee(entry.to_string()))?;
        let id: u32 = id
            .trim()
            .parse()
            .map_err(|_| ConfigError::MalformedNominee(entry.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::MalformedNominee(entry.to_string()));
        }
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateNominee(id));
        }
        nominees.push(Nominee::new(id, name));
    }

    if nominees.is_empty() {
        return Err(ConfigError::NoNominees);
    }
    Ok(nominees)
}
