// src/logging_middleware.rs
//! Request timing middleware

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Logs each request with its status and duration, and reports the duration
/// in seconds through the `X-Process-Time` response header
pub async fn log_request_timing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    debug!(method = %method, path = %path, "📥 Request");

    let mut response = next.run(request).await;

    let elapsed = started.elapsed().as_secs_f64();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_secs = elapsed,
            "📤 Response"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_secs = elapsed,
            "📤 Response"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed)) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }

    response
}
