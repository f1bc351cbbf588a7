use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{Client, header::AUTHORIZATION};

use super::ProxyError;

/// Status and raw body of an upstream token endpoint answer.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Something that accepts form-encoded token requests.
///
/// Implementations only move bytes; deciding what a status or a body means
/// is left to [`super::OAuthProxy`].
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn post_form(
        &self,
        authorization: &str,
        form: &[(&str, &str)],
    ) -> Result<UpstreamResponse, ProxyError>;
}

/// [`TokenEndpoint`] backed by a shared reqwest client.
pub struct HttpTokenEndpoint {
    client: Client,
    url: String,
}

impl HttpTokenEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn post_form(
        &self,
        authorization: &str,
        form: &[(&str, &str)],
    ) -> Result<UpstreamResponse, ProxyError> {
        let res = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, authorization)
            .form(form)
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res.bytes().await?;

        Ok(UpstreamResponse { status, body })
    }
}
