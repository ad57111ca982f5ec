//! Stock Ledger API Library
//!
//! Device stock ledger: each device carries `qty_available` / `qty_purchased`
//! aggregates kept consistent with an append-only log of stock movements.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;
pub mod stores;

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::{get, patch, post},
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{consts as perm, AccessGate, AuthRouterExt, AuthService};
use crate::services::ledger::LedgerEngine;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub ledger: LedgerEngine,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    pub limit: Option<u64>,
}

fn default_page() -> u64 {
    1
}

impl ListQuery {
    /// Page (1-based) and limit clamped to the configured bounds.
    pub fn resolve(&self, config: &config::AppConfig) -> (u64, u64) {
        let page = self.page.max(1);
        let limit = self
            .limit
            .unwrap_or(config.api_default_page_size)
            .clamp(1, config.api_max_page_size);
        (page, limit)
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    /// One line per ledger step of a write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        Self {
            items,
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            messages: None,
            errors: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<String>) -> Self {
        self.messages = Some(messages);
        self
    }
}

/// Routes mounted under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{device_logs, devices};

    let devices_public = Router::new()
        .route("/device", get(devices::list_devices))
        .route("/device/:id", get(devices::get_device));

    let devices_record = Router::new()
        .route("/device", post(devices::record_movement))
        .with_capabilities(&[perm::ORG_DEVICE_WRITE, perm::OWN_DEVICE_LOG_WRITE]);

    let devices_update = Router::new()
        .route("/device/:id", patch(devices::update_device))
        .with_capabilities(&[perm::ORG_DEVICE_WRITE]);

    let devices_retire = Router::new()
        .route("/device/:id", axum::routing::delete(devices::retire_device))
        .with_capabilities(&[perm::ORG_DEVICE_DESTROY, perm::ORG_DEVICE_LOG_DESTROY]);

    let logs_read = Router::new()
        .route("/device_log", get(device_logs::list_logs))
        .route("/device_log/:id", get(device_logs::get_log))
        .with_capabilities(&[perm::ORG_DEVICE_LOG_READ]);

    // Ownership is checked in the handler once the author is known.
    let logs_update = Router::new()
        .route("/device_log/:id", patch(device_logs::update_log))
        .with_any_capability(&[perm::OWN_DEVICE_LOG_WRITE, perm::ORG_DEVICE_LOG_WRITE]);

    let logs_reverse = Router::new()
        .route(
            "/device_log/:id",
            axum::routing::delete(device_logs::reverse_log),
        )
        .with_any_capability(&[perm::ORG_DEVICE_DESTROY, perm::ORG_DEVICE_LOG_DESTROY]);

    let stock = Router::new()
        .merge(devices_public)
        .merge(devices_record)
        .merge(devices_update)
        .merge(devices_retire)
        .merge(logs_read)
        .merge(logs_update)
        .merge(logs_reverse);

    Router::new()
        .route("/health", get(health_check))
        .nest("/stock", stock)
}

/// Complete application router with auth, tracing and timeouts applied.
pub fn app(state: AppState, auth: Arc<AuthService>, gate: Arc<dyn AccessGate>) -> Router {
    let timeout = state.config.request_timeout();

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(Extension(auth))
        .layer(Extension(gate))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Database ping; a failed ping answers 503.
async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    db::check_connection(&state.db).await?;

    let health_data = json!({
        "status": "healthy",
        "checks": {
            "database": "healthy",
        },
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

/// Request logging middleware
async fn request_logging_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    tracing::info!(method = %method, uri = %uri, "Incoming request");

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = status.as_u16(),
        elapsed_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
