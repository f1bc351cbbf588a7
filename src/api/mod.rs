//! # API Module
//!
//! This module provides the HTTP handlers of the relay server. Each endpoint
//! is an async function plugged into the axum router built in
//! [`crate::server`].
//!
//! ## Endpoints
//!
//! ### Echo
//!
//! - [`message`] - Echoes a JSON `{"data": ...}` body back as
//!   `{"data": "Received: ..."}`.
//! - [`websocket`] - Upgrades to a websocket and echoes every text or binary
//!   frame until the peer goes away.
//!
//! ### OAuth Proxy
//!
//! - [`login`] - Returns the Spotify authorize URL to redirect the user to.
//! - [`callback`] - Exchanges the authorization code for tokens.
//! - [`refresh`] - Exchanges a refresh token for a new access token.
//! - [`preflight`] - Answers CORS preflight requests for the three above.
//!
//! ### Monitoring
//!
//! - [`health`] - Returns application status and version information.
//!
//! ## Error Responses
//!
//! Handlers fail with [`ApiError`]. Errors are plain text, except for a
//! rejected OAuth `state`, which answers with an
//! [`ErrorResponse`](crate::types::ErrorResponse) body and CORS headers.
//! Upstream detail never reaches the caller.

mod callback;
mod error;
mod health;
mod login;
mod message;
mod refresh;
mod websocket;

pub use callback::callback;
pub use error::ApiError;
pub use health::health;
pub use login::login;
pub use message::message;
pub use refresh::refresh;
pub use websocket::{SessionSettings, echo_session, websocket};

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const CORS_HEADERS: [(header::HeaderName, &str); 2] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

/// Serializes `body` as JSON with the permissive CORS headers attached.
pub fn cors_json<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, CORS_HEADERS, Json(body)).into_response()
}

pub async fn preflight() -> Response {
    (StatusCode::NO_CONTENT, CORS_HEADERS).into_response()
}
