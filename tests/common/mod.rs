#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use chrono::Duration;
use orquestulator::{
    AppState, app,
    config::Config,
    session::{ManualClock, SessionStore},
    stackstorm::ConnectionsConfig,
};
use serde_json::Value;
use tower::ServiceExt;

pub const PASSPHRASE: &str = "open sesame";

pub struct TestApp {
    pub router: Router,
    pub sessions: SessionStore,
    pub clock: Arc<ManualClock>,
    pub config: Config,
}

pub fn test_config() -> Config {
    Config {
        passphrase: PASSPHRASE.to_string(),
        session_timeout_secs: 3600,
        ..Config::default()
    }
}

pub fn test_app(config: Config, connections: ConnectionsConfig) -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let sessions = SessionStore::with_clock(config.session_config(), clock.clone());
    let state = AppState::new(config.clone(), sessions.clone(), connections)
        .expect("build app state");

    TestApp {
        router: app(state),
        sessions,
        clock,
        config,
    }
}

impl TestApp {
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.expect("infallible router")
    }

    /// Authenticates and returns the `name=value` cookie pair for later requests.
    pub async fn login(&self) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/api/session/auth",
                None,
                &serde_json::json!({ "passphrase": PASSPHRASE }),
            ))
            .await;
        assert_eq!(response.status(), 200);
        cookie_pair(&response).expect("session cookie")
    }
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

pub fn cookie_pair(response: &Response<Body>) -> Option<String> {
    set_cookie(response).and_then(|raw| raw.split(';').next().map(|pair| pair.trim().to_string()))
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("json body")
}
