use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;

use crate::{info, server::AppState, warning};

/// Limits the host puts on every websocket session.
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    /// Ends the session when the peer sends nothing for this long.
    pub idle_timeout: Option<Duration>,
    /// Cancelled by the host to end all sessions, e.g. on shutdown.
    pub shutdown: CancellationToken,
}

enum Frame {
    Received(Message),
    Closed,
    Failed(axum::Error),
    Idle,
    Cancelled,
}

pub async fn websocket(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            warning!("Upgrade: {}", rejection);
            return rejection.into_response();
        }
    };

    let settings = state.session.clone();
    ws.on_failed_upgrade(|e: axum::Error| warning!("Upgrade: {}", e))
        .on_upgrade(move |socket| echo_session(socket, settings))
}

/// Echoes every text and binary frame back to the peer, one frame in
/// flight at a time, until the peer leaves, an I/O error occurs, the idle
/// timeout hits or the host cancels the session.
pub async fn echo_session(mut socket: WebSocket, settings: SessionSettings) {
    loop {
        let message = match next_frame(&mut socket, &settings).await {
            Frame::Received(message) => message,
            Frame::Closed => break,
            Frame::Failed(e) => {
                warning!("Read: {}", e);
                break;
            }
            Frame::Idle => {
                info!("Closing idle websocket session");
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            Frame::Cancelled => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        };

        match &message {
            Message::Text(text) => info!("Received: {}", text.as_str()),
            Message::Binary(bytes) => info!("Received: {} bytes", bytes.len()),
            // answered by the protocol layer
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => break,
        }

        if let Err(e) = socket.send(message).await {
            warning!("Write: {}", e);
            break;
        }
    }
}

async fn next_frame(socket: &mut WebSocket, settings: &SessionSettings) -> Frame {
    let read = async {
        match settings.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, socket.recv()).await {
                Ok(frame) => frame.into(),
                Err(_) => Frame::Idle,
            },
            None => socket.recv().await.into(),
        }
    };

    tokio::select! {
        _ = settings.shutdown.cancelled() => Frame::Cancelled,
        frame = read => frame,
    }
}

impl From<Option<Result<Message, axum::Error>>> for Frame {
    fn from(frame: Option<Result<Message, axum::Error>>) -> Self {
        match frame {
            Some(Ok(message)) => Frame::Received(message),
            Some(Err(e)) => Frame::Failed(e),
            None => Frame::Closed,
        }
    }
}
