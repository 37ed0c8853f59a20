//! Shared test helpers for HTTP tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Mutex;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use parley_api::{AppState, build_router};
use parley_auth::jwt::JwtEncoder;
use parley_core::config::AppConfig;
use parley_core::types::Identity;
use parley_realtime::{ConnectionFrame, RealtimeEngine};

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router, for driving connections directly
    pub engine: RealtimeEngine,
    /// Issues tokens the router accepts
    pub encoder: JwtEncoder,
    /// Outbound queues of directly connected clients, kept open
    held: Mutex<Vec<mpsc::Receiver<ConnectionFrame>>>,
}

/// Parsed response
pub struct TestResponse {
    /// HTTP status
    pub status: StatusCode,
    /// JSON body, `Null` when empty or not JSON
    pub body: Value,
}

impl TestApp {
    /// Create a new test application on default configuration
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application on the given configuration
    pub fn with_config(config: AppConfig) -> Self {
        let encoder = JwtEncoder::new(&config.auth);
        let engine = RealtimeEngine::new(config.realtime.clone());
        let router = build_router(AppState::new(config, engine.clone()));
        Self {
            router,
            engine,
            encoder,
            held: Mutex::new(Vec::new()),
        }
    }

    /// Serve the router on an ephemeral local port
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        addr
    }

    /// A valid bearer token for `name`
    pub fn token(&self, name: &str) -> String {
        self.encoder
            .issue(&identity(name))
            .expect("token issued")
            .token
    }

    /// Register a live connection for `name` directly with the engine
    pub async fn connect(&self, name: &str) {
        let (handle, frames) = self.engine.open_connection(identity(name));
        self.held.lock().expect("lock").push(frames);
        self.engine.connect(&handle).await.expect("connected");
    }

    /// Make a GET request to the test app
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut req = Request::builder().method("GET").uri(path);

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req.body(Body::empty()).expect("Failed to build request");
        self.send(req).await
    }

    /// Send a prepared request
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read response body");
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Parse an identity
pub fn identity(name: &str) -> Identity {
    Identity::parse(name).expect("valid identity")
}
