use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod infrastructure;
mod modules;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod workers;

use crate::config::settings::WorkerConfig;
use crate::infrastructure::db::pool::connect_to_db;
use crate::infrastructure::storage::ensure_public_bucket;
use crate::infrastructure::storage::s3::StorageService;
use crate::modules::post::repository::PostRepository;
use crate::modules::transcode::engine::{FfmpegTranscoder, HlsParams};
use crate::state::AppState;
use crate::workers::stats::WorkerStats;
use crate::workers::transcoder::{TranscodeWorker, WorkerSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Worker service starting...");

    let config = WorkerConfig::new().context("Missing required configuration")?;

    // Give the database time to come up alongside us.
    tokio::time::sleep(config.startup_delay).await;

    let db = connect_to_db(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let storage = StorageService::new(&config.storage).context("Invalid MINIO_PUBLIC_URL")?;

    ensure_public_bucket(&storage, &config.hls_bucket).await;

    let stats = Arc::new(WorkerStats::default());
    let shutdown = CancellationToken::new();

    let app = app::create_app(AppState::new(config.hls_bucket.clone(), stats.clone()));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.health_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.health_port))?;
    info!("Health endpoint on http://0.0.0.0:{}", config.health_port);

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
        {
            error!("Health server error: {}", e);
        }
    });

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown requested, finishing current job...");
        signal_shutdown.cancel();
    });

    let transcoder = FfmpegTranscoder::new(
        config.ffmpeg_path.clone(),
        HlsParams {
            segment_seconds: config.segment_seconds,
            ..HlsParams::default()
        },
    );

    let worker = TranscodeWorker::new(
        Arc::new(PostRepository::new(db)),
        Arc::new(storage),
        Arc::new(transcoder),
        WorkerSettings::from(&config),
        stats,
    );

    worker.run(shutdown).await;
    Ok(())
}
