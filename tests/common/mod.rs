#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use stock_ledger_api::{
    auth::{permissions, AccessGate, AuthConfig, AuthService, CapabilityGate},
    config::AppConfig,
    db::{self, DbConfig},
    events,
    services::ledger::LedgerEngine,
    AppState,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "k3v9Qz7LmP2xR8tW1yB4nC6dF0gH5jS7uE3iO9aZ2cV8bN1mX4qT6wY0pL5rK7hG";

/// Helper harness for spinning up the application against an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        // A single connection keeps every query on the same in-memory database.
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let ledger = LedgerEngine::with_database(db_arc.clone()).with_events(event_sender);

        let auth_service = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration),
        )));
        let gate: Arc<dyn AccessGate> = Arc::new(CapabilityGate);

        let state = AppState {
            db: db_arc,
            config: cfg,
            ledger,
        };
        let router = stock_ledger_api::app(state.clone(), auth_service.clone(), gate);

        Self {
            router,
            state,
            auth_service,
            _event_task: event_task,
        }
    }

    pub fn ledger(&self) -> &LedgerEngine {
        &self.state.ledger
    }

    /// Token for `subject` holding exactly `capabilities`.
    pub fn token_for(&self, subject: &str, capabilities: &[&str]) -> String {
        let capabilities: Vec<String> = capabilities.iter().map(|c| c.to_string()).collect();
        self.auth_service
            .issue_token(subject, &capabilities)
            .expect("issue test token")
    }

    /// Token holding every capability.
    pub fn admin_token(&self, subject: &str) -> String {
        self.auth_service
            .issue_token(subject, &permissions::all())
            .expect("issue admin token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and decodes the JSON body.
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is json")
}
