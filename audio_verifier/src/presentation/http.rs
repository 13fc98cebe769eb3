// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # HTTP Ingress Surface
//!
//! The axum router and handlers for the verification service.
//!
//! ## Routes
//!
//! | Route | Purpose |
//! |---|---|
//! | `POST /verify` | submit an encrypted blob (JSON) or, behind the legacy flag, a multipart upload |
//! | `GET /verify/{id}` | full session record |
//! | `POST /verify/{id}/cancel` | advisory cancellation |
//! | `GET /` | service info |
//! | `GET /health` | liveness (no dependency checks) |
//! | `GET /ready` | readiness (database ping + config summary) |
//! | `GET /metrics` | Prometheus exposition |
//!
//! ## Behavior
//!
//! - Bearer auth with constant-time comparison; disabled when the secret is
//!   unset (development mode).
//! - Declared content length above the configured bound is rejected with
//!   413 before the body is read.
//! - The handler never blocks on pipeline work: after decryption and early
//!   validation it persists the session, hands the job to the worker pool,
//!   and returns. A full pool is 503.
//! - Early rejects (tiny plaintext, unknown magic bytes) happen before any
//!   session row exists.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use audio_verifier_domain::entities::{DatasetMetadata, SubmissionInfo};
use audio_verifier_domain::repositories::{FailureInfo, SessionRepository};
use audio_verifier_domain::value_objects::AudioFormat;
use audio_verifier_domain::{SessionId, SessionStatus, VerifierError};

use crate::application::services::verification_pipeline::PipelineJob;
use crate::infrastructure::adapters::decryptor::{DecryptRequest, Decryptor};
use crate::infrastructure::adapters::wav_quality::WavQualityAnalyzer;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::runtime::scratch::ScratchFile;
use crate::infrastructure::runtime::worker_pool::WorkerPool;

/// Minimum plausible decrypted audio payload.
const MIN_PLAINTEXT_BYTES: usize = 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionRepository>,
    pub decryptor: Arc<dyn Decryptor>,
    pub jobs: Arc<WorkerPool<PipelineJob>>,
    pub metrics: Arc<MetricsService>,
}

/// Builds the service router with all layers applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    // The configured bound replaces axum's small default body limit; the
    // middleware below still rejects oversized uploads by declared length
    let body_limit =
        axum::extract::DefaultBodyLimit::max(state.config.max_file_size_bytes() as usize);
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .route("/verify", post(submit_verification))
        .route("/verify/:session_id", get(get_status))
        .route("/verify/:session_id/cancel", post(cancel_verification))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_size_limit,
        ))
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

// --- Error handling ---

/// Transport wrapper over the domain error, mapping kinds to statuses.
pub struct AppError(VerifierError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            VerifierError::BadRequest(_)
            | VerifierError::ValidationError(_)
            | VerifierError::SerializationError(_) => StatusCode::BAD_REQUEST,
            VerifierError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            VerifierError::AuthenticationFailure(_) => StatusCode::FORBIDDEN,
            VerifierError::NotFound(_) => StatusCode::NOT_FOUND,
            VerifierError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            VerifierError::ServiceUnavailable(_) | VerifierError::InvalidConfiguration(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            VerifierError::NetworkFailure(_) => StatusCode::BAD_GATEWAY,
            VerifierError::TimeoutError(_) => StatusCode::GATEWAY_TIMEOUT,
            VerifierError::DecryptionFailure(_)
            | VerifierError::StorageError(_)
            | VerifierError::ProcessingFailed(_)
            | VerifierError::IoError(_)
            | VerifierError::Cancelled(_)
            | VerifierError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, category = self.0.category(), "Request failed");
        } else {
            tracing::warn!(error = %self.0, category = self.0.category(), "Request rejected");
        }
        (status, Json(serde_json::json!({ "detail": self.0.to_string() }))).into_response()
    }
}

impl From<VerifierError> for AppError {
    fn from(err: VerifierError) -> Self {
        Self(err)
    }
}

// --- Middleware ---

/// Rejects oversized uploads by declared content length, before body read.
async fn enforce_size_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::POST && request.uri().path().starts_with("/verify") {
        let declared = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(length) = declared {
            if length > state.config.max_file_size_bytes() {
                tracing::warn!(
                    declared = length,
                    max = state.config.max_file_size_bytes(),
                    "Upload exceeds size limit"
                );
                state
                    .metrics
                    .submissions_rejected
                    .with_label_values(&["payload_too_large"])
                    .inc();
                return AppError(VerifierError::PayloadTooLarge(format!(
                    "File exceeds {}GB limit",
                    state.config.max_file_size_gb
                )))
                .into_response();
            }
        }
    }
    next.run(request).await
}

fn check_auth(config: &AppConfig, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = &config.verifier_auth_token else {
        return Ok(()); // development mode
    };
    let expected = format!("Bearer {}", expected);
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AppError(VerifierError::Unauthorized(
            "Invalid or missing authorization token".to_string(),
        )))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// --- Request/response shapes ---

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    blob_reference: String,
    #[serde(default)]
    identity: String,
    #[serde(default)]
    encrypted_object_hex: String,
    #[serde(default)]
    metadata: Option<DatasetMetadata>,
    #[serde(default)]
    session_key_data: String,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    session_id: SessionId,
    status: &'static str,
    estimated_seconds: u64,
}

// --- Handlers ---

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "Audio Verifier",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
        "features": [
            "Audio quality analysis",
            "Copyright detection",
            "Closed-caption transcription",
            "Content safety analysis",
        ],
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_connected = state.sessions.ping().await.is_ok();
    Json(serde_json::json!({
        "status": if db_connected { "ready" } else { "not_ready" },
        "config": {
            "database_connected": db_connected,
            "encrypted_flow_configured": state.config.encrypted_flow_ready(),
            "fingerprint_configured": state.config.fingerprint_api_key.is_some(),
            "legacy_upload_enabled": state.config.enable_legacy_upload,
            "auth_enabled": state.config.auth_enabled(),
        },
    }))
}

async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state.metrics.encode()?;
    Ok(Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap_or_default())
}

async fn submit_verification(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<SubmitResponse>, AppError> {
    check_auth(&state.config, request.headers())?;

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("application/json") {
        submit_encrypted(state, request).await
    } else if content_type.starts_with("multipart/form-data") {
        submit_legacy(state, request).await
    } else {
        Err(AppError(VerifierError::bad_request(format!(
            "Unsupported content type: {}",
            content_type
        ))))
    }
}

/// The encrypted blob flow: decrypt, early-validate, persist, dispatch.
async fn submit_encrypted(
    state: AppState,
    request: Request,
) -> Result<Json<SubmitResponse>, AppError> {
    if !state.config.encrypted_flow_ready() {
        return Err(AppError(VerifierError::ServiceUnavailable(
            "Encrypted blob verification not configured (AGGREGATOR_URL, KEY_PACKAGE_ID, KEY_SERVICE_URL required)"
                .to_string(),
        )));
    }

    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .map_err(|e| VerifierError::bad_request(format!("Failed to read request body: {}", e)))?;
    let parsed: VerifyRequest = serde_json::from_slice(&bytes)
        .map_err(|e| VerifierError::bad_request(format!("Invalid JSON request: {}", e)))?;

    for (field, value) in [
        ("blob_reference", &parsed.blob_reference),
        ("identity", &parsed.identity),
        ("encrypted_object_hex", &parsed.encrypted_object_hex),
        ("session_key_data", &parsed.session_key_data),
    ] {
        if value.is_empty() {
            return Err(AppError(VerifierError::bad_request(format!(
                "{} is required for encrypted blob verification",
                field
            ))));
        }
    }
    let metadata = parsed.metadata.ok_or_else(|| {
        VerifierError::bad_request("metadata is required for encrypted blob verification")
    })?;

    let verification_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        verification_id = %verification_id,
        blob = %parsed.blob_reference.chars().take(16).collect::<String>(),
        "Creating encrypted verification"
    );

    let decrypt_started = std::time::Instant::now();
    let plaintext = state
        .decryptor
        .decrypt(&DecryptRequest {
            blob_reference: parsed.blob_reference.clone(),
            encrypted_object_hex: parsed.encrypted_object_hex,
            identity: parsed.identity,
            session_key: parsed.session_key_data,
        })
        .await?;
    state
        .metrics
        .decrypt_duration_seconds
        .observe(decrypt_started.elapsed().as_secs_f64());

    // Early validation gate: reject tiny or unrecognizable payloads before
    // any session row exists
    if plaintext.len() < MIN_PLAINTEXT_BYTES {
        state
            .metrics
            .submissions_rejected
            .with_label_values(&["too_small"])
            .inc();
        return Err(AppError(VerifierError::bad_request(format!(
            "Invalid audio blob: decrypted size {} bytes is below minimum 1KB",
            plaintext.len()
        ))));
    }
    let Some(format) = AudioFormat::detect(&plaintext) else {
        state
            .metrics
            .submissions_rejected
            .with_label_values(&["format_probe_failed"])
            .inc();
        return Err(AppError(VerifierError::bad_request(
            "Invalid audio blob: unsupported format. Allowed: MP3, WAV, FLAC, OGG/Opus, M4A/AAC/MP4, WebM, 3GPP/3GP, AMR"
                .to_string(),
        )));
    };

    let plaintext_len = plaintext.len() as u64;
    let scratch = ScratchFile::create(
        &state.config.temp_dir,
        "decrypted",
        format.extension(),
        &plaintext,
    )
    .await?;
    drop(plaintext);

    let duration_seconds = WavQualityAnalyzer::probe_duration(scratch.path())
        .map(|d| d as u64)
        .unwrap_or(0);

    let info = SubmissionInfo {
        blob_reference: parsed.blob_reference.clone(),
        plaintext_size_bytes: plaintext_len,
        duration_seconds,
        file_format: format.mime().to_string(),
        metadata: metadata.clone(),
    };

    finish_submission(state, verification_id, info, scratch, format, metadata).await
}

/// The legacy multipart flow, gated behind `ENABLE_LEGACY_UPLOAD`.
async fn submit_legacy(
    state: AppState,
    request: Request,
) -> Result<Json<SubmitResponse>, AppError> {
    if !state.config.enable_legacy_upload {
        return Err(AppError(VerifierError::bad_request(
            "Legacy file upload disabled. Use the encrypted blob flow or set ENABLE_LEGACY_UPLOAD=true",
        )));
    }

    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| VerifierError::bad_request(format!("Invalid multipart request: {}", e)))?;

    let verification_id = uuid::Uuid::new_v4().to_string();
    let mut metadata: Option<DatasetMetadata> = None;
    let mut scratch: Option<(ScratchFile, u64)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| VerifierError::bad_request(format!("Malformed multipart field: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "metadata" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| VerifierError::bad_request(format!("Unreadable metadata: {}", e)))?;
                metadata = Some(
                    serde_json::from_str(&text)
                        .map_err(|_| VerifierError::bad_request("Invalid metadata JSON"))?,
                );
            }
            "file" => {
                // Stream to disk; multi-gigabyte uploads never sit in memory
                tokio::fs::create_dir_all(&state.config.temp_dir).await.map_err(VerifierError::from)?;
                let path = state
                    .config
                    .temp_dir
                    .join(format!("upload_{}_{}", verification_id, uuid::Uuid::new_v4()));
                let mut file = tokio::fs::File::create(&path)
                    .await
                    .map_err(VerifierError::from)?;
                let guard = ScratchFile::adopt(path);
                let mut written: u64 = 0;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| VerifierError::bad_request(format!("Upload interrupted: {}", e)))?
                {
                    file.write_all(&chunk).await.map_err(VerifierError::from)?;
                    written += chunk.len() as u64;
                }
                file.flush().await.map_err(VerifierError::from)?;
                scratch = Some((guard, written));
            }
            _ => {}
        }
    }

    let Some((scratch, written)) = scratch else {
        return Err(AppError(VerifierError::bad_request(
            "Missing file or metadata in FormData request",
        )));
    };
    let Some(metadata) = metadata else {
        return Err(AppError(VerifierError::bad_request(
            "Missing file or metadata in FormData request",
        )));
    };
    if written < MIN_PLAINTEXT_BYTES as u64 {
        return Err(AppError(VerifierError::bad_request(format!(
            "Invalid audio upload: {} bytes is below minimum 1KB",
            written
        ))));
    }

    let head = read_head(scratch.path(), 40).await?;
    let Some(format) = AudioFormat::detect(&head) else {
        return Err(AppError(VerifierError::bad_request(
            "Invalid audio upload: unsupported format",
        )));
    };

    let duration_seconds = WavQualityAnalyzer::probe_duration(scratch.path())
        .map(|d| d as u64)
        .unwrap_or(0);
    let info = SubmissionInfo {
        blob_reference: String::new(),
        plaintext_size_bytes: written,
        duration_seconds,
        file_format: format.mime().to_string(),
        metadata: metadata.clone(),
    };

    finish_submission(state, verification_id, info, scratch, format, metadata).await
}

/// Persists the session row and hands the run to the worker pool.
async fn finish_submission(
    state: AppState,
    verification_id: String,
    info: SubmissionInfo,
    scratch: ScratchFile,
    format: AudioFormat,
    metadata: DatasetMetadata,
) -> Result<Json<SubmitResponse>, AppError> {
    let plaintext_len = info.plaintext_size_bytes;
    let blob_reference = info.blob_reference.clone();
    let session_id = state.sessions.create(&verification_id, info).await?;
    state.metrics.sessions_started.inc();

    let job = PipelineJob {
        session_id,
        scratch,
        format,
        metadata,
        blob_reference,
    };
    if let Err(e) = state.jobs.try_dispatch(job) {
        // The job (and its scratch file) is gone; leave an honest record
        state
            .metrics
            .submissions_rejected
            .with_label_values(&["capacity"])
            .inc();
        let _ = state
            .sessions
            .mark_failed(
                session_id,
                FailureInfo {
                    errors: vec!["Verification capacity exhausted before processing".to_string()],
                    stage_failed: "queued".to_string(),
                    ..FailureInfo::default()
                },
            )
            .await;
        return Err(AppError(e));
    }

    let estimated_seconds = estimate_seconds(plaintext_len);
    tracing::info!(
        session_id = %session_id.short(),
        estimated_seconds,
        "Dispatched verification"
    );
    Ok(Json(SubmitResponse {
        session_id,
        status: "processing",
        estimated_seconds,
    }))
}

async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&state.config, &headers)?;
    let id = parse_session_id(&session_id)?;
    let session = state
        .sessions
        .get(id)
        .await?
        .ok_or_else(|| VerifierError::NotFound("Session not found".to_string()))?;
    Ok(Json(serde_json::to_value(&session).map_err(VerifierError::from)?))
}

async fn cancel_verification(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&state.config, &headers)?;
    let id = parse_session_id(&session_id)?;
    let session = state
        .sessions
        .get(id)
        .await?
        .ok_or_else(|| VerifierError::NotFound("Session not found".to_string()))?;

    if session.status != SessionStatus::Processing {
        return Err(AppError(VerifierError::bad_request(format!(
            "Session already {}",
            session.status
        ))));
    }

    state
        .sessions
        .mark_failed(
            id,
            FailureInfo {
                errors: vec!["Verification cancelled by user".to_string()],
                stage_failed: "cancelled".to_string(),
                cancelled: true,
                ..FailureInfo::default()
            },
        )
        .await?;
    state.metrics.sessions_cancelled.inc();

    Ok(Json(serde_json::json!({
        "session_id": id,
        "status": "cancelled",
    })))
}

// --- Helpers ---

fn parse_session_id(raw: &str) -> Result<SessionId, AppError> {
    SessionId::parse(raw)
        .map_err(|_| AppError(VerifierError::bad_request(format!("Invalid session id: {}", raw))))
}

/// Rough completion estimate: one second per megabyte, clamped to [10, 60].
fn estimate_seconds(size_bytes: u64) -> u64 {
    let megabytes = size_bytes / (1024 * 1024);
    megabytes.clamp(10, 60)
}

async fn read_head(path: &std::path::Path, n: usize) -> Result<Vec<u8>, VerifierError> {
    use tokio::io::AsyncReadExt;
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        let read = file.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    buffer.truncate(filled);
    Ok(buffer)
}
