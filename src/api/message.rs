use axum::{Json, body::Bytes, http::Method};
use serde_json::Deserializer;

use crate::types::Message;

use super::ApiError;

pub async fn message(method: Method, body: Bytes) -> Result<Json<Message>, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let msg = decode_first(&body)?;
    Ok(Json(Message::received(&msg.data)))
}

/// Decodes the first JSON value of the body and ignores whatever follows.
/// A `null` body counts as a message with empty `data`.
fn decode_first(body: &[u8]) -> Result<Message, ApiError> {
    let first = Deserializer::from_slice(body)
        .into_iter::<Option<Message>>()
        .next()
        .ok_or_else(|| ApiError::BadRequest("empty body".to_string()))?;

    let msg = first.map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(msg.unwrap_or_else(|| Message::new("")))
}
