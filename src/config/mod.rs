//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::collision::{Arena, DEFAULT_ARENA_HEIGHT, DEFAULT_ARENA_WIDTH};
use crate::util::rate_limit::INPUT_RATE_LIMIT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Canvas dimensions shared with the client
    pub arena: Arena,
    /// Fixed RNG seed for reproducible spawns (random when unset)
    pub game_seed: Option<u64>,
    /// Max input messages per second per connection
    pub input_rate_limit: u32,

    /// Directory served under /public
    pub public_dir: PathBuf,
    /// Directory served under /assets
    pub assets_dir: PathBuf,
    /// HTML shell served at /
    pub index_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let width = parse_or(&lookup, "ARENA_WIDTH", DEFAULT_ARENA_WIDTH)?;
        let height = parse_or(&lookup, "ARENA_HEIGHT", DEFAULT_ARENA_HEIGHT)?;

        let game_seed = match lookup("GAME_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("GAME_SEED", raw))?,
            ),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            arena: Arena::new(width, height),
            game_seed,
            input_rate_limit: parse_or(&lookup, "INPUT_RATE_LIMIT", INPUT_RATE_LIMIT)?,

            public_dir: lookup("PUBLIC_DIR")
                .unwrap_or_else(|| "public".to_string())
                .into(),
            assets_dir: lookup("ASSETS_DIR")
                .unwrap_or_else(|| "assets".to_string())
                .into(),
            index_file: lookup("INDEX_FILE")
                .unwrap_or_else(|| "views/index.html".to_string())
                .into(),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Invalid server address format")]
    InvalidAddress,
}
