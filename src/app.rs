// src/app.rs
//! Router composition shared by the server binary and the HTTP tests

use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::common::{AppConfig, AppState};
use crate::{auth, candidates, logging_middleware, users};

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn build_router(state: Arc<RwLock<AppState>>, config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth::auth_routes())
        .merge(candidates::candidates_routes(config.max_upload_size))
        .merge(users::users_routes())
        .layer(middleware::from_fn(logging_middleware::log_request_timing))
        .layer(Extension(state))
        .layer(cors_layer(&config.cors_origins))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static(
            logging_middleware::PROCESS_TIME_HEADER,
        )])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": format!("Welcome to {}", APP_NAME),
        "version": APP_VERSION,
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": APP_VERSION,
    }))
}
