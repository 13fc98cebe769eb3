// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! HTTP ingress tests: auth, early validation, size limits, decryption
//! error mapping, cancellation, and backpressure — all against an in-memory
//! stack with a stubbed decryption engine.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use async_trait::async_trait;
use audio_verifier::application::services::verification_pipeline::PipelineJob;
use audio_verifier::infrastructure::adapters::decryptor::{DecryptRequest, Decryptor};
use audio_verifier::infrastructure::config::AppConfig;
use audio_verifier::infrastructure::metrics::MetricsService;
use audio_verifier::infrastructure::repositories::MemorySessionStore;
use audio_verifier::infrastructure::runtime::worker_pool::WorkerPool;
use audio_verifier::presentation::http::{build_router, AppState};
use audio_verifier_bootstrap::shutdown::ShutdownCoordinator;
use audio_verifier_domain::repositories::SessionRepository;
use audio_verifier_domain::{SessionStatus, SubmissionInfo, VerifierError};

use common::clean_wav;

const AUTH_TOKEN: &str = "secret-token";

/// Decryptor stub returning fixed plaintext or a scripted error.
struct StubDecryptor {
    outcome: Result<Vec<u8>, VerifierError>,
}

#[async_trait]
impl Decryptor for StubDecryptor {
    async fn decrypt(&self, _request: &DecryptRequest) -> Result<Vec<u8>, VerifierError> {
        self.outcome.clone()
    }
}

struct TestApp {
    router: Router,
    sessions: Arc<MemorySessionStore>,
    _temp: tempfile::TempDir,
}

fn test_config(temp: &std::path::Path) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://unused".to_string()),
        ("TRANSCRIPTION_API_KEY", "tk".to_string()),
        ("ANALYSIS_API_KEY", "ak".to_string()),
        ("AGGREGATOR_URL", "https://aggregator.example".to_string()),
        ("KEY_PACKAGE_ID", "0xpkg".to_string()),
        ("KEY_SERVICE_URL", "https://keys.example".to_string()),
        ("VERIFIER_AUTH_TOKEN", AUTH_TOKEN.to_string()),
        ("MAX_FILE_SIZE_GB", "1".to_string()),
        ("TEMP_DIR", temp.display().to_string()),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn app_with(decrypt_outcome: Result<Vec<u8>, VerifierError>) -> TestApp {
    app_with_pool(decrypt_outcome, 2, 8)
}

fn app_with_pool(
    decrypt_outcome: Result<Vec<u8>, VerifierError>,
    workers: usize,
    capacity: usize,
) -> TestApp {
    let temp = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(temp.path()));
    let sessions = Arc::new(MemorySessionStore::new());
    let shutdown = ShutdownCoordinator::default();
    // Ingress tests only exercise dispatch; workers drop the job (and with
    // it the scratch file)
    let jobs = Arc::new(WorkerPool::new(
        workers,
        capacity,
        shutdown.token(),
        |_job: PipelineJob| async {},
    ));
    let state = AppState {
        config,
        sessions: sessions.clone(),
        decryptor: Arc::new(StubDecryptor {
            outcome: decrypt_outcome,
        }),
        jobs,
        metrics: Arc::new(MetricsService::new().unwrap()),
    };
    TestApp {
        router: build_router(state),
        sessions,
        _temp: temp,
    }
}

fn submit_request(authorized: bool) -> Request<Body> {
    let body = serde_json::json!({
        "blob_reference": "blob-abc",
        "identity": "0xidentity",
        "encrypted_object_hex": "deadbeef",
        "metadata": {"title": "t", "description": "d", "walletAddress": "0x01"},
        "session_key_data": "session-key",
    });
    let mut builder = Request::builder()
        .method("POST")
        .uri("/verify")
        .header(header::CONTENT_TYPE, "application/json");
    if authorized {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", AUTH_TOKEN));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_bearer_is_unauthorized() {
    let app = app_with(Ok(clean_wav()));
    let response = app.router.oneshot(submit_request(false)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_wrong_bearer_is_unauthorized() {
    let app = app_with(Ok(clean_wav()));
    let request = Request::builder()
        .method("POST")
        .uri("/verify")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_submission_creates_session_and_returns_estimate() {
    let app = app_with(Ok(clean_wav()));
    let response = app.router.oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    assert_eq!(payload["status"], "processing");
    let estimate = payload["estimated_seconds"].as_u64().unwrap();
    assert!((10..=60).contains(&estimate));

    let session_id = payload["session_id"].as_str().unwrap();
    assert_eq!(app.sessions.len(), 1);
    let id = audio_verifier_domain::SessionId::parse(session_id).unwrap();
    let session = app.sessions.get(id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Processing);
    assert_eq!(session.initial_data.blob_reference, "blob-abc");
    assert_eq!(session.initial_data.file_format, "audio/wav");
    assert!(session.initial_data.plaintext_size_bytes > 1024);
}

#[tokio::test]
async fn test_tiny_decrypted_blob_rejected_before_session_creation() {
    // A 32-byte plaintext must be rejected with 400 and leave no session row
    let app = app_with(Ok(vec![0xab; 32]));
    let response = app.router.oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert!(payload["detail"].as_str().unwrap().contains("below minimum 1KB"));
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_boundary_1023_rejected_1024_accepted() {
    let app = app_with(Ok(vec![0u8; 1023]));
    let response = app.router.clone().oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.sessions.is_empty());

    // 1024 bytes with a valid WAV header passes the early gates
    let mut payload = clean_wav();
    payload.truncate(1024);
    let app = app_with(Ok(payload));
    let response = app.router.oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.sessions.len(), 1);
}

#[tokio::test]
async fn test_unknown_format_rejected() {
    let app = app_with(Ok(vec![0x42; 4096]));
    let response = app.router.oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert!(payload["detail"].as_str().unwrap().contains("unsupported format"));
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_decryption_network_failure_maps_to_502() {
    let app = app_with(Err(VerifierError::network_failure(
        "Blob blob-abc not found after 11 attempts",
    )));
    let response = app.router.oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_decryption_policy_denial_maps_to_403() {
    let app = app_with(Err(VerifierError::AuthenticationFailure(
        "Key service denied policy access (403)".to_string(),
    )));
    let response = app.router.oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_decryption_timeout_maps_to_504() {
    let app = app_with(Err(VerifierError::timeout("Key recovery timed out")));
    let response = app.router.oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_missing_required_fields_rejected() {
    let app = app_with(Ok(clean_wav()));
    let body = serde_json::json!({
        "blob_reference": "blob-abc",
        "metadata": {"title": "t"},
    });
    let request = Request::builder()
        .method("POST")
        .uri("/verify")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", AUTH_TOKEN))
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert!(payload["detail"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn test_oversized_declared_length_is_413_before_body_read() {
    let app = app_with(Ok(clean_wav()));
    let request = Request::builder()
        .method("POST")
        .uri("/verify")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", AUTH_TOKEN))
        .header(header::CONTENT_LENGTH, (2u64 * 1024 * 1024 * 1024).to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_legacy_multipart_disabled_by_default() {
    let app = app_with(Ok(clean_wav()));
    let request = Request::builder()
        .method("POST")
        .uri("/verify")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=xyz")
        .header(header::AUTHORIZATION, format!("Bearer {}", AUTH_TOKEN))
        .body(Body::from("--xyz--"))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert!(payload["detail"].as_str().unwrap().contains("Legacy"));
}

#[tokio::test]
async fn test_status_unknown_session_is_404() {
    let app = app_with(Ok(clean_wav()));
    let request = Request::builder()
        .method("GET")
        .uri(format!("/verify/{}", uuid::Uuid::new_v4()))
        .header(header::AUTHORIZATION, format!("Bearer {}", AUTH_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_flow() {
    let app = app_with(Ok(clean_wav()));
    let id = app
        .sessions
        .create("verif-cancel", SubmissionInfo::default())
        .await
        .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/verify/{}/cancel", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", AUTH_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["status"], "cancelled");

    let session = app.sessions.get(id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Cancelled);

    // Cancelling a terminal session is rejected at ingress
    let request = Request::builder()
        .method("POST")
        .uri(format!("/verify/{}/cancel", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", AUTH_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backpressure_returns_503_and_leaves_honest_record() {
    // Zero effective workers: one worker blocked forever, queue of one
    let temp = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(temp.path()));
    let sessions = Arc::new(MemorySessionStore::new());
    let shutdown = ShutdownCoordinator::default();
    let jobs = Arc::new(WorkerPool::new(
        1,
        1,
        shutdown.token(),
        |job: PipelineJob| async move {
            // Hold the job so the queue stays full
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            drop(job);
        },
    ));
    let state = AppState {
        config,
        sessions: sessions.clone(),
        decryptor: Arc::new(StubDecryptor {
            outcome: Ok(clean_wav()),
        }),
        jobs,
        metrics: Arc::new(MetricsService::new().unwrap()),
    };
    let router = build_router(state);

    // First two occupy the worker and the queue slot
    for _ in 0..2 {
        let response = router.clone().oneshot(submit_request(true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    // Third overflows
    let response = router.oneshot(submit_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_probe_endpoints() {
    let app = app_with(Ok(clean_wav()));

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["status"], "ready");
    assert_eq!(payload["config"]["encrypted_flow_configured"], true);

    let response = app
        .router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
