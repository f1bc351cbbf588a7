//! Configuration management for the chat relay server.
//!
//! This module handles loading configuration values from environment
//! variables and `.env` files. Everything is read exactly once at startup
//! into a [`Config`] value which is then handed to the server and the OAuth
//! proxy; nothing reads the process environment while serving requests.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. An explicit `.env` file, `./.env`, or `.env` in the local data directory
//! 3. Application defaults (where applicable)

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;

use crate::{spotify, types::StateMode};

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:5001";
pub const DEFAULT_STATE_TTL_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("cannot load env file: {0}")]
    EnvFile(String),
}

/// Loads a dotenv file into the process environment.
///
/// Looks at `path` when given, otherwise at `./.env` and then at
/// `<data_local_dir>/chatserver/.env`. The first file that exists wins.
/// A missing file is fine since every value may come from the real
/// environment; a file that exists but cannot be parsed is an error.
pub async fn load_env(path: Option<&Path>) -> Result<(), ConfigError> {
    if let Some(path) = path {
        return dotenv::from_path(path)
            .map(|_| ())
            .map_err(|e| ConfigError::EnvFile(format!("{}: {}", path.display(), e)));
    }

    let local = PathBuf::from(".env");
    if async_fs::metadata(&local).await.is_ok() {
        return dotenv::from_path(&local)
            .map(|_| ())
            .map_err(|e| ConfigError::EnvFile(format!("{}: {}", local.display(), e)));
    }

    let data_env = data_env_path();
    if let Some(parent) = data_env.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::EnvFile(e.to_string()))?;
    }

    if async_fs::metadata(&data_env).await.is_ok() {
        dotenv::from_path(&data_env)
            .map_err(|e| ConfigError::EnvFile(format!("{}: {}", data_env.display(), e)))?;
    }

    Ok(())
}

fn data_env_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("chatserver/.env");
    path
}

/// Runtime configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub scope: String,
    pub state_mode: StateMode,
    pub state_ttl: Duration,
    /// `None` keeps websocket sessions open for as long as the peer does.
    pub ws_idle_timeout: Option<Duration>,
}

impl Config {
    /// Builds a configuration with the fixed Spotify endpoints and the
    /// given client credentials. Everything else takes its default.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: spotify::REDIRECT_URI.to_string(),
            authorize_url: spotify::AUTHORIZE_URL.to_string(),
            token_url: spotify::TOKEN_URL.to_string(),
            scope: spotify::SCOPE.to_string(),
            state_mode: StateMode::default(),
            state_ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECS),
            ws_idle_timeout: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(
            required("SPOTIFY_CLIENT_ID")?,
            required("SPOTIFY_CLIENT_SECRET")?,
        );

        if let Some(address) = optional("SERVER_ADDRESS") {
            config.server_address = address;
        }

        if let Some(mode) = optional("OAUTH_STATE_MODE") {
            config.state_mode = mode.parse().map_err(|_| ConfigError::Invalid {
                var: "OAUTH_STATE_MODE",
                value: mode,
            })?;
        }

        if let Some(secs) = optional_secs("OAUTH_STATE_TTL_SECS")? {
            config.state_ttl = Duration::from_secs(secs);
        }

        config.ws_idle_timeout = optional_secs("WS_IDLE_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(config)
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::Missing(var))
}

fn optional(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn optional_secs(var: &'static str) -> Result<Option<u64>, ConfigError> {
    optional(var)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid { var, value })
        })
        .transpose()
}
