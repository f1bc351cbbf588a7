use axum::{
    Router,
    routing::{any, get},
};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    Res,
    api::{self, SessionSettings},
    config::Config,
    info,
    spotify::OAuthProxy,
    success,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<OAuthProxy>,
    pub session: SessionSettings,
}

impl AppState {
    pub fn new(config: &Config, shutdown: CancellationToken) -> Self {
        Self::with_proxy(config, OAuthProxy::new(config), shutdown)
    }

    pub fn with_proxy(config: &Config, proxy: OAuthProxy, shutdown: CancellationToken) -> Self {
        Self {
            proxy: Arc::new(proxy),
            session: SessionSettings {
                idle_timeout: config.ws_idle_timeout,
                shutdown,
            },
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/message", any(api::message))
        .route("/ws", get(api::websocket))
        .route("/login", get(api::login).options(api::preflight))
        .route("/callback", get(api::callback).options(api::preflight))
        .route("/refresh_token", get(api::refresh).options(api::preflight))
        .route("/health", get(api::health))
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn start_api_server(config: Config) -> Res<()> {
    let addr = SocketAddr::from_str(&config.server_address)
        .map_err(|e| format!("Failed to parse server address {}: {}", config.server_address, e))?;

    let listener = TcpListener::bind(&addr).await?;

    let shutdown = CancellationToken::new();
    let state = AppState::new(&config, shutdown.clone());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            signal.cancel();
        }
    });

    info!(
        "Server is listening on {} (state mode: {})...",
        listener.local_addr()?,
        config.state_mode
    );

    serve(listener, state).await?;

    success!("Server stopped");
    Ok(())
}

/// Serves on an already bound listener until the state's shutdown token is
/// cancelled. Cancelling also ends every open websocket session.
pub async fn serve(listener: TcpListener, state: AppState) -> Res<()> {
    let shutdown = state.session.shutdown.clone();

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
