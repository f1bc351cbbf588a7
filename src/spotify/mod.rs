//! # Spotify Integration Module
//!
//! This module proxies the Spotify OAuth 2.0 authorization-code flow for a
//! browser client. The relay holds the client secret; the browser only ever
//! sees the login URL and the token JSON returned by Spotify.
//!
//! ## Architecture
//!
//! ```text
//! HTTP handlers (crate::api)
//!          ↓
//! OAuthProxy (auth)          login URL, code exchange, token refresh
//!          ↓
//! TokenEndpoint (client)     form POST with Basic credentials
//!          ↓
//! accounts.spotify.com/api/token
//! ```
//!
//! ## Error Handling
//!
//! Every upstream failure is reported as a [`ProxyError`]. The four upstream
//! classes (building the request, sending it, a non-200 status and an
//! undecodable body) all end up as the same generic internal error for the
//! caller; the detail is only logged on the server.
//!
//! ## Testing
//!
//! [`TokenEndpoint`] is the seam for tests: [`auth::OAuthProxy`] accepts any
//! implementation, so a fake upstream can be injected without network access.

pub mod auth;
mod client;

pub use auth::OAuthProxy;
pub use client::{HttpTokenEndpoint, TokenEndpoint, UpstreamResponse};

use thiserror::Error;

use crate::management::StateError;

pub const REDIRECT_URI: &str = "http://localhost:8100/callback";
pub const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize/";
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SCOPE: &str = "streaming user-library-modify user-library-read user-modify-playback-state user-read-playback-state user-read-email user-read-private playlist-read-private";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("error creating request: {0}")]
    Request(String),

    #[error("error sending request: {0}")]
    Transport(String),

    #[error("unexpected response status code: {0}")]
    Status(u16),

    #[error("error decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    State(#[from] StateError),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ProxyError::Request(err.to_string())
        } else {
            ProxyError::Transport(err.to_string())
        }
    }
}
