// src/candidates/routes.rs

use crate::candidates::handlers;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

/// Multipart framing on top of the largest accepted file
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn candidates_routes(max_upload_size: usize) -> Router {
    let body_limit = DefaultBodyLimit::max(max_upload_size.saturating_add(MULTIPART_OVERHEAD));

    Router::new()
        // Upload routes
        .route(
            "/api/candidates/upload",
            post(handlers::upload_resume).layer(body_limit),
        )
        .route(
            "/api/candidates/upload/sync",
            post(handlers::upload_resume_sync).layer(body_limit),
        )
        .route(
            "/api/ingestion-tasks/:id",
            get(handlers::get_ingestion_task),
        )
        // Candidate routes
        .route("/api/candidates", get(handlers::list_candidates))
        .route(
            "/api/candidates/search/by-email",
            get(handlers::search_by_email),
        )
        .route(
            "/api/candidates/search/by-skill",
            get(handlers::search_by_skill),
        )
        .route(
            "/api/candidates/:id",
            get(handlers::get_candidate).delete(handlers::delete_candidate),
        )
        .route(
            "/api/candidates/:id/status",
            patch(handlers::update_candidate_status),
        )
        .route(
            "/api/candidates/:id/download",
            get(handlers::download_resume),
        )
        // Note routes
        .route(
            "/api/candidates/:id/notes",
            post(handlers::create_note).get(handlers::list_notes),
        )
        .route(
            "/api/candidates/notes/:note_id",
            get(handlers::get_note)
                .patch(handlers::update_note)
                .delete(handlers::delete_note),
        )
}
