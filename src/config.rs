use log::{info, warn};
use std::{env, fmt::Display, str::FromStr, time::Duration};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:5000/socket.io/?EIO=4&transport=websocket";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:poll_votes.db";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub socket_url: String,
    pub database_url: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Split out so tests don't have to touch the process environment
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = try_load(&lookup, "POLL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS);
        Self {
            api_url: load_or(&lookup, "POLL_API_URL", DEFAULT_API_URL),
            socket_url: load_or(&lookup, "POLL_SOCKET_URL", DEFAULT_SOCKET_URL),
            database_url: load_or(&lookup, "DATABASE_URL", DEFAULT_DATABASE_URL),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn load_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|value| !value.trim().is_empty()) {
        Some(value) => value.trim().to_string(),
        None => {
            info!("{} not set, using default: {}", key, default);
            default.to_string()
        }
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    let raw = match lookup(key) {
        Some(raw) => raw,
        None => {
            info!("{} not set, using default: {}", key, default);
            return default;
        }
    };
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {} value {:?}: {}, using default: {}", key, raw, e, default);
        default
    })
}
