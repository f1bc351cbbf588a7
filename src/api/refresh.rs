use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};

use crate::server::AppState;

use super::{ApiError, cors_json};

pub async fn refresh(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let refresh_token = params
        .get("refresh_token")
        .map(String::as_str)
        .unwrap_or_default();

    let token = state.proxy.refresh_token(refresh_token).await?;
    Ok(cors_json(StatusCode::OK, token))
}
