use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of the message echo endpoint and wrapper for the login URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub data: String,
}

impl Message {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    pub fn received(data: &str) -> Self {
        Self::new(format!("Received: {data}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Whatever JSON object the upstream token endpoint answered with. It is
/// passed through to the caller without looking at its fields.
pub type TokenResponse = Map<String, Value>;

/// How the OAuth callback treats the `state` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StateMode {
    /// Any non-empty `state` is accepted. Nothing is stored.
    #[default]
    Presence,
    /// `state` must be one issued by the login endpoint, unexpired and
    /// not used before.
    Strict,
}

impl FromStr for StateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "presence" => Ok(StateMode::Presence),
            "strict" => Ok(StateMode::Strict),
            other => Err(format!("unknown state mode: {other}")),
        }
    }
}

impl fmt::Display for StateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateMode::Presence => write!(f, "presence"),
            StateMode::Strict => write!(f, "strict"),
        }
    }
}
