use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use chatserver::{
    config::Config,
    server::{self, AppState},
    spotify,
    types::StateMode,
    utils::basic_auth_header,
};
use futures::{SinkExt, StreamExt};
use reqwest::{Client, Url};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Requests seen by the fake token endpoint: Authorization header and form
type Seen = Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>;

#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    body: &'static str,
    seen: Seen,
}

async fn token(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    upstream.seen.lock().unwrap().push((authorization, form));

    (
        upstream.status,
        [(header::CONTENT_TYPE, "application/json")],
        upstream.body,
    )
}

async fn spawn_upstream(status: StatusCode, body: &'static str) -> (String, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new().route("/api/token", post(token)).with_state(Upstream {
        status,
        body,
        seen: seen.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api/token"), seen)
}

fn test_config(token_url: &str) -> Config {
    let mut config = Config::new("test-client", "test-secret");
    config.token_url = token_url.to_string();
    config
}

async fn spawn_relay(config: Config) -> (SocketAddr, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let state = AppState::new(&config, shutdown.clone());

    tokio::spawn(async move {
        server::serve(listener, state).await.unwrap();
    });

    (addr, shutdown)
}

fn assert_cors(res: &reqwest::Response) {
    let headers = res.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}

async fn connect_ws(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

async fn expect_closed(ws: &mut WsClient) {
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;

    assert!(closed.is_ok(), "session was not closed by the server");
}

#[tokio::test]
async fn test_message_echo() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;

    let res = Client::new()
        .post(format!("http://{addr}/message"))
        .body(r#"{"data": "hello"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"data": "Received: hello"}));
}

#[tokio::test]
async fn test_message_rejects_other_methods() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;
    let client = Client::new();

    let res = client
        .get(format!("http://{addr}/message"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 405);
    assert_eq!(res.text().await.unwrap(), "Method not allowed");

    let res = client
        .put(format!("http://{addr}/message"))
        .body(r#"{"data": "hello"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 405);
}

#[tokio::test]
async fn test_message_rejects_malformed_body() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;
    let client = Client::new();

    for body in ["{not json", r#"{"data": 5}"#, ""] {
        let res = client
            .post(format!("http://{addr}/message"))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400, "body {body:?}");
        assert_eq!(res.text().await.unwrap(), "Bad request");
    }
}

#[tokio::test]
async fn test_message_decodes_first_value_only() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;
    let client = Client::new();

    let cases = [
        ("null", "Received: "),
        (r#"{"data": "first"} {"data": "second"}"#, "Received: first"),
        ("{\"data\": \"hi\"}\ntrailing garbage", "Received: hi"),
        ("  {}  ", "Received: "),
    ];

    for (body, expected) in cases {
        let res = client
            .post(format!("http://{addr}/message"))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200, "body {body:?}");
        let echoed: Value = res.json().await.unwrap();
        assert_eq!(echoed, json!({"data": expected}), "body {body:?}");
    }
}

#[tokio::test]
async fn test_login_returns_authorize_url() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;
    let client = Client::new();

    let mut states = Vec::new();
    for _ in 0..2 {
        let res = client
            .get(format!("http://{addr}/login"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_cors(&res);

        let body: Value = res.json().await.unwrap();
        let url = Url::parse(body["data"].as_str().unwrap()).unwrap();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(query["client_id"], "test-client");
        assert_eq!(query["redirect_uri"], "http://localhost:8100/callback");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["scope"], spotify::SCOPE);
        assert!(!query["state"].is_empty());
        states.push(query["state"].clone());
    }

    assert_ne!(states[0], states[1]);
}

#[tokio::test]
async fn test_callback_with_empty_state_is_rejected() {
    let (token_url, seen) = spawn_upstream(StatusCode::OK, "{}").await;
    let (addr, _) = spawn_relay(test_config(&token_url)).await;
    let client = Client::new();

    for query in ["code=abc&state=", "code=abc", ""] {
        let res = client
            .get(format!("http://{addr}/callback?{query}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400, "query {query:?}");
        assert_cors(&res);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({"error": "State Mismatch"}));
    }

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_passes_token_through() {
    let (token_url, seen) = spawn_upstream(
        StatusCode::OK,
        r#"{"access_token": "abc", "token_type": "Bearer"}"#,
    )
    .await;
    let (addr, _) = spawn_relay(test_config(&token_url)).await;

    let res = Client::new()
        .get(format!("http://{addr}/callback?code=the-code&state=xyz"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_cors(&res);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"access_token": "abc", "token_type": "Bearer"}));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (authorization, form) = &seen[0];
    assert_eq!(
        authorization.as_deref(),
        Some(basic_auth_header("test-client", "test-secret").as_str())
    );
    assert_eq!(form["code"], "the-code");
    assert_eq!(form["redirect_uri"], "http://localhost:8100/callback");
    assert_eq!(form["grant_type"], "authorization_code");
}

#[tokio::test]
async fn test_callback_hides_upstream_errors() {
    let (token_url, _) = spawn_upstream(
        StatusCode::BAD_REQUEST,
        r#"{"error": "invalid_grant", "error_description": "secret detail"}"#,
    )
    .await;
    let (addr, _) = spawn_relay(test_config(&token_url)).await;

    let res = Client::new()
        .get(format!("http://{addr}/callback?code=bad&state=xyz"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body = res.text().await.unwrap();
    assert_eq!(body, "Internal Server Error");
    assert!(!body.contains("invalid_grant"));
    assert!(!body.contains("secret detail"));
}

#[tokio::test]
async fn test_refresh_token_passes_token_through() {
    let (token_url, seen) = spawn_upstream(StatusCode::OK, r#"{"access_token": "fresh"}"#).await;
    let (addr, _) = spawn_relay(test_config(&token_url)).await;

    let res = Client::new()
        .get(format!("http://{addr}/refresh_token?refresh_token=old"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_cors(&res);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"access_token": "fresh"}));

    let seen = seen.lock().unwrap();
    let (authorization, form) = &seen[0];
    assert_eq!(
        authorization.as_deref(),
        Some(basic_auth_header("test-client", "test-secret").as_str())
    );
    assert_eq!(form["client_id"], "test-client");
    assert_eq!(form["refresh_token"], "old");
    assert_eq!(form["grant_type"], "refresh_token");
}

#[tokio::test]
async fn test_refresh_token_hides_upstream_errors() {
    let (token_url, seen) = spawn_upstream(
        StatusCode::BAD_REQUEST,
        r#"{"error": "invalid_request", "error_description": "secret detail"}"#,
    )
    .await;
    let (addr, _) = spawn_relay(test_config(&token_url)).await;

    // an empty refresh token is forwarded and rejected upstream
    let res = Client::new()
        .get(format!("http://{addr}/refresh_token"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert!(res.headers().get("access-control-allow-origin").is_none());
    let body = res.text().await.unwrap();
    assert_eq!(body, "Internal Server Error");
    assert!(!body.contains("secret detail"));
    assert_eq!(seen.lock().unwrap()[0].1["refresh_token"], "");
}

#[tokio::test]
async fn test_unreachable_upstream_is_internal_error() {
    // bind and drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = listener.local_addr().unwrap();
    drop(listener);

    let (addr, _) = spawn_relay(test_config(&format!("http://{closed}/api/token"))).await;

    let res = Client::new()
        .get(format!("http://{addr}/refresh_token?refresh_token=old"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
}

#[tokio::test]
async fn test_strict_state_mode() {
    let (token_url, seen) = spawn_upstream(StatusCode::OK, r#"{"access_token": "abc"}"#).await;
    let mut config = test_config(&token_url);
    config.state_mode = StateMode::Strict;
    let (addr, _) = spawn_relay(config).await;
    let client = Client::new();

    let res = client
        .get(format!("http://{addr}/callback?code=c&state=forged"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let body: Value = client
        .get(format!("http://{addr}/login"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let url = Url::parse(body["data"].as_str().unwrap()).unwrap();
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let callback = format!("http://{addr}/callback?code=c&state={state}");
    let res = client.get(&callback).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client.get(&callback).send().await.unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "State Mismatch"}));

    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_preflight_sets_cors_headers() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;
    let client = Client::new();

    for path in ["login", "callback", "refresh_token"] {
        let res = client
            .request(reqwest::Method::OPTIONS, format!("http://{addr}/{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 204, "path {path}");
        assert_cors(&res);
    }
}

#[tokio::test]
async fn test_health() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;

    let res = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["state_mode"], "presence");
}

#[tokio::test]
async fn test_websocket_echoes_frames_in_order() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;
    let mut ws = connect_ws(addr).await;

    let frames = vec![
        Message::text("hello"),
        Message::binary(vec![0u8, 1, 2, 255]),
        Message::text(""),
        Message::text("{\"data\": \"json too\"}"),
    ];

    for frame in frames {
        ws.send(frame.clone()).await.unwrap();
        let echoed = ws.next().await.unwrap().unwrap();
        assert_eq!(echoed, frame);
    }
}

#[tokio::test]
async fn test_websocket_requires_upgrade() {
    let (addr, _) = spawn_relay(test_config(spotify::TOKEN_URL)).await;

    let res = reqwest::get(format!("http://{addr}/ws")).await.unwrap();
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn test_websocket_idle_timeout_closes_session() {
    let mut config = test_config(spotify::TOKEN_URL);
    config.ws_idle_timeout = Some(Duration::from_millis(300));
    let (addr, _) = spawn_relay(config).await;
    let mut ws = connect_ws(addr).await;

    // traffic keeps the session alive
    for i in 0..3 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let frame = Message::text(format!("ping {i}"));
        ws.send(frame.clone()).await.unwrap();
        assert_eq!(ws.next().await.unwrap().unwrap(), frame);
    }

    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_websocket_closes_on_shutdown() {
    let (addr, shutdown) = spawn_relay(test_config(spotify::TOKEN_URL)).await;
    let mut ws = connect_ws(addr).await;

    ws.send(Message::text("before")).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap(), Message::text("before"));

    shutdown.cancel();
    expect_closed(&mut ws).await;
}
