// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audio Verifier Binary
//!
//! Process entry point: parses CLI flags, loads the immutable configuration
//! from the environment, constructs one pool per datastore, wires every
//! component through its port, and serves the HTTP surface until a
//! termination signal drains the worker pool.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use audio_verifier::application::services::reward_applier::RewardApplier;
use audio_verifier::application::services::verification_pipeline::VerificationPipeline;
use audio_verifier::infrastructure::adapters::blob_store::{FetchRetryPolicy, HttpBlobSource};
use audio_verifier::infrastructure::adapters::decryptor::DecryptionEngine;
use audio_verifier::infrastructure::adapters::fingerprint::HttpFingerprintDetector;
use audio_verifier::infrastructure::adapters::key_service::{HttpKeyService, KeyRetryPolicy};
use audio_verifier::infrastructure::adapters::openrouter::{
    ChatCompletionClient, OpenRouterAnalyst, OpenRouterTranscriber, DEFAULT_BASE_URL,
};
use audio_verifier::infrastructure::adapters::wav_quality::WavQualityAnalyzer;
use audio_verifier::infrastructure::config::AppConfig;
use audio_verifier::infrastructure::metrics::MetricsService;
use audio_verifier::infrastructure::repositories::{PgContributorStore, PgSessionStore};
use audio_verifier::infrastructure::runtime::rate_limiter::TokenBucket;
use audio_verifier::infrastructure::runtime::worker_pool::WorkerPool;
use audio_verifier::presentation::http::{build_router, AppState};
use audio_verifier_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use audio_verifier_bootstrap::shutdown::ShutdownCoordinator;
use audio_verifier_domain::services::QualityThresholds;

/// Audio dataset verification service.
#[derive(Parser, Debug)]
#[command(name = "audio_verifier", version, about)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Tracing filter override (e.g. "info,audio_verifier=debug")
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = args
        .log
        .clone()
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let logger = ConsoleLogger::new();
    logger.info("Starting audio verifier bootstrap");

    let config = match AppConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            logger.error(&format!("Configuration invalid: {}", e));
            std::process::exit(1);
        }
    };
    if !config.encrypted_flow_ready() {
        logger.warn("Encrypted blob flow not fully configured; POST /verify will return 503");
    }
    if config.fingerprint_api_key.is_none() {
        logger.warn("FINGERPRINT_API_KEY unset; copyright checks disabled");
    }
    if !config.auth_enabled() {
        logger.warn("VERIFIER_AUTH_TOKEN unset; running without authentication (development mode)");
    }

    // One pool per datastore, injected into components (never constructed lazily)
    let session_store = Arc::new(PgSessionStore::connect(&config.database_url).await?);
    let contributor_store = Arc::new(PgContributorStore::new(session_store.pool().clone()).await?);
    logger.info("Session and contributor stores ready");

    let metrics = Arc::new(MetricsService::new()?);

    let decryptor = {
        let blobs = Arc::new(HttpBlobSource::new(
            config.aggregator_url.clone().unwrap_or_default(),
            config.aggregator_token.clone(),
        )?);
        let keys = Arc::new(HttpKeyService::new(
            config.key_service_url.clone().unwrap_or_default(),
            config.key_package_id.clone().unwrap_or_default(),
            KeyRetryPolicy::default(),
        )?);
        Arc::new(DecryptionEngine::new(blobs, keys, FetchRetryPolicy::default()))
    };

    let limiter = Arc::new(TokenBucket::per_process_default());
    let transcriber = Arc::new(OpenRouterTranscriber::new(Arc::new(
        ChatCompletionClient::new(
            DEFAULT_BASE_URL.to_string(),
            config.transcription_api_key.clone(),
            Some(Arc::clone(&limiter)),
        )?,
    )));
    let analyst = Arc::new(OpenRouterAnalyst::new(Arc::new(ChatCompletionClient::new(
        DEFAULT_BASE_URL.to_string(),
        config.analysis_api_key.clone(),
        Some(Arc::clone(&limiter)),
    )?)));
    let quality = Arc::new(WavQualityAnalyzer::new(QualityThresholds::default()));
    let copyright = Arc::new(HttpFingerprintDetector::new(
        config.fingerprint_api_key.clone(),
        config.fingerprint_service_url.clone(),
    ));

    let rewards = Arc::new(RewardApplier::new(contributor_store));
    let pipeline = Arc::new(VerificationPipeline::new(
        session_store.clone(),
        quality,
        copyright,
        transcriber,
        analyst,
        rewards,
        Arc::clone(&metrics),
    ));

    let shutdown = ShutdownCoordinator::default();
    shutdown.listen_for_signals();

    let jobs = {
        let pipeline = Arc::clone(&pipeline);
        Arc::new(WorkerPool::new(
            config.max_concurrent_pipelines,
            config.max_concurrent_pipelines * 2,
            shutdown.token(),
            move |job| {
                let pipeline = Arc::clone(&pipeline);
                async move { pipeline.run(job).await }
            },
        ))
    };

    let state = AppState {
        config: Arc::clone(&config),
        sessions: session_store,
        decryptor,
        jobs,
        metrics,
    };
    let router = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.port));
    logger.info(&format!("Listening on {}", addr));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server_token = shutdown.token();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await?;

    shutdown.initiate_shutdown();
    shutdown.complete_shutdown();
    logger.info("Audio verifier stopped");
    Ok(())
}
