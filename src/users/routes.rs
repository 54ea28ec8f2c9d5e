// src/users/routes.rs

use axum::{
    routing::{get, patch},
    Router,
};

use super::handlers;

pub fn users_routes() -> Router {
    Router::new()
        .route(
            "/api/users/me",
            get(handlers::get_me).put(handlers::update_me),
        )
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/api/users/:id/activate", patch(handlers::activate_user))
        .route("/api/users/:id/deactivate", patch(handlers::deactivate_user))
}
