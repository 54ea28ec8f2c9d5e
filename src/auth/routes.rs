//! Authentication routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/token` - Issue an access token for a user (admin)
/// - `POST /api/auth/logout` - Logout (client-side token removal)
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/token", post(handlers::issue_token))
        .route("/api/auth/logout", post(handlers::logout_handler))
}
