//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use rdm_web::config::AppConfig;
use rdm_web::http::{ApiResponse, AppState, HttpServer};
use rdm_web::{Authenticator, EventHub, Shutdown};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "s3cret";

/// A running server bound to an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: EventHub,
    pub auth: Authenticator,
    pub shutdown: Shutdown,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// The Origin a browser on the served page would send.
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Business routes standing in for the real connection services.
fn business_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/connection/list",
            get(|| async { ApiResponse::ok(json!([{"name": "local"}])) }),
        )
        .route(
            "/api/connection/save",
            post(|| async { ApiResponse::success() }),
        )
}

pub fn auth_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.enabled = true;
    config.auth.username = USERNAME.into();
    config.auth.password = PASSWORD.into();
    config
}

pub async fn start_server(config: AppConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).with_api(business_routes());
    let hub = server.hub();
    let auth = server.authenticator();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, rx));

    TestServer {
        addr,
        hub,
        auth,
        shutdown,
        handle,
    }
}

/// Log in through the API and return the session cookie value.
pub async fn login(server: &TestServer, client: &reqwest::Client) -> String {
    let resp = client
        .post(server.url("/api/auth/login"))
        .json(&json!({"username": USERNAME, "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("login sets the session cookie")
        .to_str()
        .unwrap();
    let pair = set_cookie.split(';').next().unwrap();
    let (name, value) = pair.split_once('=').unwrap();
    assert_eq!(name, "rdm_token");
    value.to_string()
}

/// Poll until `check` holds or the deadline passes.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
