use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};

use crate::server::AppState;

use super::{ApiError, cors_json};

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let code = params.get("code").map(String::as_str).unwrap_or_default();
    let oauth_state = params.get("state").map(String::as_str).unwrap_or_default();

    let token = state.proxy.exchange_code(code, oauth_state).await?;
    Ok(cors_json(StatusCode::OK, token))
}
