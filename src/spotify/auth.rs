use std::sync::Arc;

use reqwest::Url;

use crate::{
    config::Config,
    management::StateManager,
    types::TokenResponse,
    utils,
};

use super::{HttpTokenEndpoint, ProxyError, TokenEndpoint, UpstreamResponse};

/// Server side half of the Spotify authorization-code flow.
///
/// Owns the client credentials and the token endpoint so that neither is
/// exposed to the browser. All three operations are independent of each
/// other; the only state shared between requests is the [`StateManager`],
/// which stays empty unless strict state checking is configured.
pub struct OAuthProxy {
    client_id: String,
    authorization: String,
    redirect_uri: String,
    authorize_url: String,
    scope: String,
    endpoint: Arc<dyn TokenEndpoint>,
    states: StateManager,
}

impl OAuthProxy {
    /// Creates a proxy talking to the token endpoint named in `config`.
    pub fn new(config: &Config) -> Self {
        let endpoint = Arc::new(HttpTokenEndpoint::new(config.token_url.clone()));
        Self::with_endpoint(config, endpoint)
    }

    pub fn with_endpoint(config: &Config, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self {
            client_id: config.client_id.clone(),
            authorization: utils::basic_auth_header(&config.client_id, &config.client_secret),
            redirect_uri: config.redirect_uri.clone(),
            authorize_url: config.authorize_url.clone(),
            scope: config.scope.clone(),
            endpoint,
            states: StateManager::new(config.state_mode, config.state_ttl),
        }
    }

    pub fn states(&self) -> &StateManager {
        &self.states
    }

    /// Builds the authorize URL the browser should be sent to, including a
    /// freshly generated `state`.
    pub async fn login_url(&self) -> Result<String, ProxyError> {
        let mut url = Url::parse(&self.authorize_url)
            .map_err(|e| ProxyError::Request(format!("invalid authorize URL: {e}")))?;

        let state = utils::generate_state();

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scope)
            .append_pair("state", &state);

        self.states.add(&state).await;

        Ok(url.to_string())
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// The `state` is checked before anything is sent upstream.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<TokenResponse, ProxyError> {
        self.states.redeem(state).await?;

        let form = [
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        self.request_token(&form).await
    }

    /// Exchanges a refresh token for a new access token. An empty
    /// `refresh_token` is forwarded as is and left for Spotify to reject.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, ProxyError> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        self.request_token(&form).await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, ProxyError> {
        let UpstreamResponse { status, body } =
            self.endpoint.post_form(&self.authorization, form).await?;

        if status != 200 {
            return Err(ProxyError::Status(status));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
