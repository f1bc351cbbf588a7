use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{management::StateError, spotify::ProxyError, types::ErrorResponse, warning};

use super::cors_json;

pub const STATE_MISMATCH: &str = "State Mismatch";
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    State(StateError),

    #[error(transparent)]
    Internal(ProxyError),
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::State(state) => ApiError::State(state),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(detail) => {
                warning!("Bad request: {}", detail);
                (StatusCode::BAD_REQUEST, "Bad request").into_response()
            }
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
            }
            ApiError::State(err) => {
                warning!("Rejected callback: {}", err);
                cors_json(StatusCode::BAD_REQUEST, ErrorResponse::new(STATE_MISMATCH))
            }
            ApiError::Internal(err) => {
                warning!("{}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR).into_response()
            }
        }
    }
}
