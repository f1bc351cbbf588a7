use axum::{extract::State, http::StatusCode, response::Response};

use crate::{server::AppState, types::Message};

use super::{ApiError, cors_json};

pub async fn login(State(state): State<AppState>) -> Result<Response, ApiError> {
    let url = state.proxy.login_url().await?;
    Ok(cors_json(StatusCode::OK, Message::new(url)))
}
