pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::extraction::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // CV API
        .route("/api/v1/cv/extract", post(handlers::handle_extract))
        .route("/api/v1/cv/update", patch(handlers::handle_update))
        .route("/api/v1/cv/latest", get(handlers::handle_latest))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::{AgentFailurePolicy, Config, PipelineConfig};
    use crate::llm_client::testing::ScriptedCompletion;
    use crate::pdf::testing::{ok, ScriptedDecoder};
    use crate::pdf::{DocumentError, TextExtractor};
    use crate::storage::{CvStore, MemoryCvStore, ObjectKind};

    const BOUNDARY: &str = "cvparse-test-boundary";

    struct Harness {
        app: Router,
        store: Arc<MemoryCvStore>,
        _reference: TempDir,
    }

    fn scripted_llm() -> ScriptedCompletion {
        ScriptedCompletion::new()
            .reply(
                "CANDIDATE IDENTITY",
                r#"{"full_name": "Jane Doe", "headline": "Data Engineer", "email": "jane@example.com",
                    "phone": "123", "location": null, "introduction": null}"#,
            )
            .reply(
                "PROFESSIONAL WORK EXPERIENCE",
                r#"{"experiences": [{"company": "Acme", "role": "Data Engineer",
                    "responsibilities": ["Built pipelines"], "start_date": "2020", "end_date": null}]}"#,
            )
            .reply("EDUCATION HISTORY", r#"{"education": []}"#)
            .reply("PROJECT BLOCKS", r#"{"projects": ["Realtime dashboard"]}"#)
            .reply("CERTIFICATIONS LIST", r#"{"certifications": []}"#)
    }

    fn harness(extractor: TextExtractor) -> Harness {
        let reference = TempDir::new().unwrap();
        std::fs::write(
            reference.path().join("tech_job_roles_skills.csv"),
            "job_title,skills\nData Engineer,\"Python, SQL\"\n",
        )
        .unwrap();

        let store = Arc::new(MemoryCvStore::new());
        let config = Config {
            s3_bucket: "cvs".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            anthropic_api_key: "test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            max_upload_bytes: 1024,
            pipeline: PipelineConfig {
                reference_data_dir: reference.path().to_path_buf(),
                agent_timeout: Duration::from_secs(30),
                failure_policy: AgentFailurePolicy::AllOrNothing,
                scan_skills_without_role: false,
            },
        };
        let state = AppState {
            llm: Arc::new(scripted_llm()),
            store: store.clone(),
            extractor: Arc::new(extractor),
            config,
        };

        Harness {
            app: build_router(state),
            store,
            _reference: reference,
        }
    }

    fn readable_pdf() -> TextExtractor {
        TextExtractor::new(
            ScriptedDecoder::pages("standard", &[ok("Jane Doe\nData Engineer\nPython and SQL")]),
            ScriptedDecoder::pages("lenient", &[]),
            None,
        )
    }

    fn upload(user_id: Uuid, file_name: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/cv/extract?user_id={user_id}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn patch_update(user_id: Uuid, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::PATCH)
            .uri(format!("/api/v1/cv/update?user_id={user_id}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_latest(user_id: Uuid) -> Request<Body> {
        Request::builder()
            .uri(format!("/api/v1/cv/latest?user_id={user_id}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(readable_pdf());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "cvparse-api");
    }

    #[tokio::test]
    async fn test_extract_stores_raw_and_parsed() {
        let h = harness(readable_pdf());
        let user = Uuid::new_v4();

        let (status, body) = send(&h.app, upload(user, "Jane_CV.pdf", b"%PDF-1.7")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["cv_data"]["identity"]["full_name"], "Jane Doe");
        assert_eq!(
            body["cv_data"]["skills_analysis"]["related_roles"],
            json!(["data engineer"])
        );
        assert_eq!(body["metadata"], body["cv_data"]["metadata"]);

        let raw = body["storage_paths"]["raw"].as_str().unwrap();
        let parsed = body["storage_paths"]["parsed"].as_str().unwrap();
        assert!(raw.starts_with(&format!("{user}/raw/")));
        assert!(raw.ends_with("_Jane_CV.pdf"));
        assert!(parsed.ends_with("_Jane_CV.json"));
        assert_eq!(
            h.store.latest_key(user, ObjectKind::Parsed).await.unwrap().as_deref(),
            Some(parsed)
        );
    }

    #[tokio::test]
    async fn test_extract_rejects_non_pdf_upload() {
        let h = harness(readable_pdf());
        let user = Uuid::new_v4();

        let (status, body) = send(&h.app, upload(user, "cv.docx", b"PK")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(h.store.latest_key(user, ObjectKind::Raw).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extract_rejects_empty_upload() {
        let h = harness(readable_pdf());
        let (status, body) = send(&h.app, upload(Uuid::new_v4(), "cv.pdf", b"")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_password_protected_pdf_is_user_fixable() {
        let h = harness(TextExtractor::new(
            ScriptedDecoder::failing("standard", DocumentError::Encrypted),
            ScriptedDecoder::failing("lenient", DocumentError::Encrypted),
            None,
        ));
        let user = Uuid::new_v4();

        let (status, body) = send(&h.app, upload(user, "cv.pdf", b"%PDF-1.7")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "PDF_EXTRACTION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("password-protected"));
        assert!(h.store.latest_key(user, ObjectKind::Raw).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_then_latest() {
        let h = harness(readable_pdf());
        let user = Uuid::new_v4();

        let (status, _) = send(&h.app, patch_update(user, json!({"headline": "X"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, extracted) = send(&h.app, upload(user, "cv.pdf", b"%PDF-1.7")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&h.app, patch_update(user, json!({"headline": "X"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage_path"], extracted["storage_paths"]["parsed"]);

        let (status, latest) = send(&h.app, get_latest(user)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["cv_data"]["identity"]["headline"], "X");
        assert_eq!(latest["cv_data"]["identity"]["phone"], "123");
        assert_eq!(
            latest["cv_data"]["experience"],
            extracted["cv_data"]["experience"]
        );
        assert_eq!(latest["storage_paths"], extracted["storage_paths"]);
    }

    #[tokio::test]
    async fn test_update_with_no_fields_is_rejected() {
        let h = harness(readable_pdf());
        let (status, body) = send(&h.app, patch_update(Uuid::new_v4(), json!({"email": null}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_latest_without_cv_is_not_found() {
        let h = harness(readable_pdf());
        let (status, body) = send(&h.app, get_latest(Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
