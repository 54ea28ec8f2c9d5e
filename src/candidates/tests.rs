//! Tests for candidates module
//!
//! Validator rules plus end-to-end HTTP checks through the full router:
//! authentication, role gates, uploads, listing and note permissions.

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::app::build_router;
    use crate::auth::{Role, User};
    use crate::candidates::models::*;
    use crate::candidates::validators::*;
    use crate::common::config::parse_extensions;
    use crate::common::test_support::*;
    use crate::common::Validator;
    use crate::services::oracle::testing::{candidate, ScriptedOracle};
    use crate::services::text_extractor::fixtures::docx_bytes;

    // ============================================================================
    // Validator Tests
    // ============================================================================

    fn extensions() -> HashSet<String> {
        parse_extensions("pdf,doc,docx")
    }

    #[test]
    fn test_upload_validator_accepts_allowed_types_case_insensitively() {
        let allowed = extensions();
        let validator = UploadValidator {
            allowed_extensions: &allowed,
            max_size: 1024,
        };

        for filename in ["cv.pdf", "CV.DOCX", "resume.final.doc"] {
            let result = validator.validate(&UploadFile { filename, size: 10 });
            assert!(result.is_valid, "{} should be accepted", filename);
        }
    }

    #[test]
    fn test_upload_validator_rejects_type_and_size() {
        let allowed = extensions();
        let validator = UploadValidator {
            allowed_extensions: &allowed,
            max_size: 1024,
        };

        let result = validator.validate(&UploadFile {
            filename: "photo.png",
            size: 10,
        });
        assert!(!result.is_valid);
        assert!(result.errors[0].message.contains("doc, docx, pdf"));

        let result = validator.validate(&UploadFile {
            filename: "cv.pdf",
            size: 0,
        });
        assert_eq!(result.errors[0].message, "File is empty");

        let result = validator.validate(&UploadFile {
            filename: "cv.pdf",
            size: 1025,
        });
        assert!(result.errors[0].message.starts_with("File too large"));
    }

    #[test]
    fn test_note_validator() {
        let ok = CreateNoteRequest {
            note: "Strong Rust background".to_string(),
            previous_status: Some("completed".to_string()),
            new_status: Some("reviewing".to_string()),
        };
        assert!(NoteValidator.validate(&ok).is_valid);

        let blank = UpdateNoteRequest {
            note: "   ".to_string(),
        };
        assert!(!NoteValidator.validate(&blank).is_valid);

        let too_long = UpdateNoteRequest {
            note: "x".repeat(MAX_NOTE_LENGTH + 1),
        };
        assert!(!NoteValidator.validate(&too_long).is_valid);

        let bad_status = CreateNoteRequest {
            note: "fine".to_string(),
            previous_status: None,
            new_status: Some("hired".to_string()),
        };
        let result = NoteValidator.validate(&bad_status);
        assert_eq!(result.errors[0].field, "new_status");
    }

    #[test]
    fn test_status_update_validator() {
        let ok = StatusUpdateRequest {
            status: "interview_scheduled".to_string(),
            note: None,
        };
        assert!(StatusUpdateValidator.validate(&ok).is_valid);

        let bad = StatusUpdateRequest {
            status: "archived".to_string(),
            note: None,
        };
        assert!(!StatusUpdateValidator.validate(&bad).is_valid);
    }

    // ============================================================================
    // HTTP Tests
    // ============================================================================

    const BOUNDARY: &str = "candidate-test-boundary";

    struct Harness {
        app: Router,
        pool: sqlx::SqlitePool,
        oracle: Arc<ScriptedOracle>,
        _dir: tempfile::TempDir,
    }

    async fn harness() -> Harness {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(ScriptedOracle::always(Ok(candidate(
            "Ada Lovelace",
            Some("ada@example.com"),
            Some("+44 20 0000 0000"),
            &["Rust", "SQL"],
        ))));

        let config = test_config(&dir.path().join("uploads"));
        let state = test_state(pool.clone(), oracle.clone(), config.clone());
        let app = build_router(state, &config);

        Harness {
            app,
            pool,
            oracle,
            _dir: dir,
        }
    }

    fn multipart_upload(uri: &str, user: &User, filename: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                b = BOUNDARY,
                f = filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(user))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn authed_request(method: &str, uri: &str, user: &User, json: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(user));

        match json {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public_and_timed() {
        let h = harness().await;

        let response = h
            .app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-process-time"));
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_candidate_routes_require_token() {
        let h = harness().await;

        let response = h
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/candidates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_viewer_cannot_upload() {
        let h = harness().await;
        let viewer = insert_user(&h.pool, Role::Viewer).await;

        let request = multipart_upload(
            "/api/candidates/upload/sync",
            &viewer,
            "cv.docx",
            &docx_bytes(&["Ada Lovelace"]),
        );
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(h.oracle.calls(), 0);
        assert_eq!(count_rows(&h.pool, "candidates").await, 0);
    }

    #[tokio::test]
    async fn test_sync_upload_creates_candidate() {
        let h = harness().await;
        let recruiter = insert_user(&h.pool, Role::Recruiter).await;

        let request = multipart_upload(
            "/api/candidates/upload/sync",
            &recruiter,
            "Ada Lovelace CV.docx",
            &docx_bytes(&["Ada Lovelace", "Rust, SQL", "ada@example.com"]),
        );
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["name"], "Ada Lovelace");
        assert_eq!(body["skills"], serde_json::json!(["Rust", "SQL"]));
        assert_eq!(body["uploaded_by"], recruiter.id.as_str());
        assert!(body.get("raw_parsed_data").is_none());
        assert_eq!(h.oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_sync_upload_twice_updates_same_candidate() {
        let h = harness().await;
        let recruiter = insert_user(&h.pool, Role::Recruiter).await;
        let file = docx_bytes(&["Ada Lovelace"]);

        let first = h
            .app
            .clone()
            .oneshot(multipart_upload("/api/candidates/upload/sync", &recruiter, "a.docx", &file))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let first_id = json_body(first).await["id"].as_str().unwrap().to_string();

        let second = h
            .app
            .oneshot(multipart_upload("/api/candidates/upload/sync", &recruiter, "b.docx", &file))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CREATED);
        let body = json_body(second).await;

        assert_eq!(body["id"], first_id.as_str());
        assert_eq!(body["filename"], "b.docx");
        assert_eq!(count_rows(&h.pool, "candidates").await, 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_extension() {
        let h = harness().await;
        let recruiter = insert_user(&h.pool, Role::Recruiter).await;

        let request = multipart_upload("/api/candidates/upload", &recruiter, "cv.txt", b"plain text");
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("File type not allowed"));
        assert_eq!(count_rows(&h.pool, "ingestion_tasks").await, 0);
    }

    #[tokio::test]
    async fn test_queued_upload_returns_task() {
        let h = harness().await;
        let recruiter = insert_user(&h.pool, Role::Recruiter).await;

        let request = multipart_upload(
            "/api/candidates/upload",
            &recruiter,
            "cv.docx",
            &docx_bytes(&["Ada Lovelace"]),
        );
        let response = h.app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "processing");
        let task_id = body["task_id"].as_str().unwrap().to_string();

        let response = h
            .app
            .oneshot(authed_request(
                "GET",
                &format!("/api/ingestion-tasks/{}", task_id),
                &recruiter,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let task = json_body(response).await;
        assert_eq!(task["status"], "queued");
        assert!(task.get("file_path").is_none());
    }

    #[tokio::test]
    async fn test_list_paginates_and_filters_by_skills() {
        let h = harness().await;
        let viewer = insert_user(&h.pool, Role::Viewer).await;

        insert_candidate(
            &h.pool,
            CandidateSeed::completed(&viewer.id, "2024-01-01T00:00:00.000000Z")
                .name("Oldest")
                .skills(&["Python", "Django"]),
        )
        .await;
        insert_candidate(
            &h.pool,
            CandidateSeed::completed(&viewer.id, "2024-01-02T00:00:00.000000Z")
                .name("Middle")
                .skills(&["Rust", "AWS"]),
        )
        .await;
        insert_candidate(
            &h.pool,
            CandidateSeed::completed(&viewer.id, "2024-01-03T00:00:00.000000Z")
                .name("Newest")
                .skills(&["Python", "AWS"]),
        )
        .await;

        let response = h
            .app
            .clone()
            .oneshot(authed_request("GET", "/api/candidates?skip=1&limit=1", &viewer, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["name"], "Middle");

        let response = h
            .app
            .oneshot(authed_request(
                "GET",
                "/api/candidates?skills=python%20AND%20aws%20OR%20rust",
                &viewer,
                None,
            ))
            .await
            .unwrap();
        let names: Vec<String> = json_body(response)
            .await
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Newest", "Middle"]);
    }

    #[tokio::test]
    async fn test_unknown_skill_mode_is_bad_request() {
        let h = harness().await;
        let viewer = insert_user(&h.pool, Role::Viewer).await;

        let response = h
            .app
            .oneshot(authed_request(
                "GET",
                "/api/candidates?skills=rust&skill_mode=fuzzy",
                &viewer,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_change_records_note() {
        let h = harness().await;
        let recruiter = insert_user_named(&h.pool, Role::Recruiter, Some("Grace Hopper")).await;
        let id = insert_candidate(
            &h.pool,
            CandidateSeed::completed(&recruiter.id, "2024-01-01T00:00:00.000000Z"),
        )
        .await;

        let response = h
            .app
            .clone()
            .oneshot(authed_request(
                "PATCH",
                &format!("/api/candidates/{}/status", id),
                &recruiter,
                Some(serde_json::json!({ "status": "reviewing" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["candidate"]["status"], "reviewing");
        assert_eq!(body["note"]["previous_status"], "completed");
        assert_eq!(body["note"]["created_by"], "Grace Hopper");

        let response = h
            .app
            .oneshot(authed_request(
                "GET",
                &format!("/api/candidates/{}/notes", id),
                &recruiter,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_viewer_cannot_edit_someone_elses_note() {
        let h = harness().await;
        let author = insert_user(&h.pool, Role::Viewer).await;
        let other_viewer = insert_user(&h.pool, Role::Viewer).await;
        let id = insert_candidate(
            &h.pool,
            CandidateSeed::completed(&author.id, "2024-01-01T00:00:00.000000Z"),
        )
        .await;

        let response = h
            .app
            .clone()
            .oneshot(authed_request(
                "POST",
                &format!("/api/candidates/{}/notes", id),
                &author,
                Some(serde_json::json!({ "note": "Promising" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let note_id = json_body(response).await["id"].as_str().unwrap().to_string();

        let response = h
            .app
            .clone()
            .oneshot(authed_request(
                "PATCH",
                &format!("/api/candidates/notes/{}", note_id),
                &other_viewer,
                Some(serde_json::json!({ "note": "Rewritten" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = h
            .app
            .oneshot(authed_request(
                "PATCH",
                &format!("/api/candidates/notes/{}", note_id),
                &author,
                Some(serde_json::json!({ "note": "Very promising" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["note"], "Very promising");
    }

    #[tokio::test]
    async fn test_download_missing_file_is_not_found() {
        let h = harness().await;
        let viewer = insert_user(&h.pool, Role::Viewer).await;
        let id = insert_candidate(
            &h.pool,
            CandidateSeed::completed(&viewer.id, "2024-01-01T00:00:00.000000Z"),
        )
        .await;

        let response = h
            .app
            .oneshot(authed_request(
                "GET",
                &format!("/api/candidates/{}/download", id),
                &viewer,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
