use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::settings::WorkerConfig;
use crate::infrastructure::storage::ObjectStore;
use crate::modules::post::model::{Post, PostKind};
use crate::modules::post::repository::JobStore;
use crate::modules::transcode::engine::Transcoder;
use crate::modules::transcode::error::PipelineError;
use crate::modules::transcode::publisher::OutputPublisher;
use crate::modules::transcode::source::{ResolutionError, SourceResolver};
use crate::modules::transcode::workspace::JobWorkspace;
use crate::workers::stats::WorkerStats;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub raw_bucket: String,
    pub hls_bucket: String,
    pub work_dir: PathBuf,
    pub poll_interval: Duration,
}

impl From<&WorkerConfig> for WorkerSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            raw_bucket: config.raw_bucket.clone(),
            hls_bucket: config.hls_bucket.clone(),
            work_dir: config.work_dir.clone(),
            poll_interval: config.poll_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Idle,
    ClaimLost(Uuid),
    Completed { post_id: Uuid, media_url: String },
    Failed { post_id: Uuid, kind: &'static str },
}

/// Claims pending video posts one at a time and turns them into HLS.
#[derive(Clone)]
pub struct TranscodeWorker {
    jobs: Arc<dyn JobStore>,
    storage: Arc<dyn ObjectStore>,
    transcoder: Arc<dyn Transcoder>,
    publisher: Arc<OutputPublisher>,
    resolver: SourceResolver,
    settings: WorkerSettings,
    stats: Arc<WorkerStats>,
}

impl TranscodeWorker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        storage: Arc<dyn ObjectStore>,
        transcoder: Arc<dyn Transcoder>,
        settings: WorkerSettings,
        stats: Arc<WorkerStats>,
    ) -> Self {
        let publisher = Arc::new(OutputPublisher::new(settings.hls_bucket.clone()));
        let resolver = SourceResolver::new(settings.raw_bucket.clone())
            .with_foreign_bucket(settings.hls_bucket.clone());
        Self {
            jobs,
            storage,
            transcoder,
            publisher,
            resolver,
            settings,
            stats,
        }
    }

    /// Poll until `shutdown` fires. A job already in flight always runs to the end.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "🎥 Transcoder worker polling every {:?} ({} -> {})",
            self.settings.poll_interval, self.settings.raw_bucket, self.settings.hls_bucket
        );

        while !shutdown.is_cancelled() {
            let idle = match self.poll_once().await {
                Ok(PollOutcome::Idle) => true,
                Ok(_) => false,
                Err(e) => {
                    error!("Worker loop error: {:#}", e);
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                }
            }
        }

        info!("🛑 Transcoder worker stopped");
    }

    /// One claim-process-commit cycle.
    ///
    /// Only job-table errors are returned; pipeline errors become FAILED.
    pub async fn poll_once(&self) -> anyhow::Result<PollOutcome> {
        let Some(post) = self.jobs.next_pending(PostKind::Video).await? else {
            return Ok(PollOutcome::Idle);
        };

        if !self.jobs.claim(post.id).await? {
            warn!(post_id = %post.id, "Post {} was claimed by another worker", post.id);
            self.stats.claim_lost();
            return Ok(PollOutcome::ClaimLost(post.id));
        }

        let span = info_span!("job", post_id = %post.id);
        info!(parent: &span, "📦 Processing post {}", post.id);
        self.stats.job_started(post.id);

        let result = self.process(&post).instrument(span.clone()).await;
        let outcome = self.commit(&post, result).instrument(span).await;
        if outcome.is_err() {
            self.stats.job_abandoned();
        }
        outcome
    }

    async fn commit(
        &self,
        post: &Post,
        result: Result<String, PipelineError>,
    ) -> anyhow::Result<PollOutcome> {
        let kind = match result {
            Ok(media_url) => match self.jobs.complete(post.id, &media_url).await {
                Ok(()) => {
                    info!(post_id = %post.id, "✅ Post {} processing complete: {}", post.id, media_url);
                    self.stats.job_completed();
                    return Ok(PollOutcome::Completed {
                        post_id: post.id,
                        media_url,
                    });
                }
                Err(e) => {
                    error!(post_id = %post.id, "❌ Failed to record completion of post {}: {:#}", post.id, e);
                    "commit"
                }
            },
            Err(e) => {
                error!(post_id = %post.id, kind = e.kind(), "❌ Error processing post {}: {}", post.id, e);
                e.kind()
            }
        };

        self.jobs.fail(post.id).await?;
        self.stats.job_failed();
        Ok(PollOutcome::Failed {
            post_id: post.id,
            kind,
        })
    }

    async fn process(&self, post: &Post) -> Result<String, PipelineError> {
        let locator = post
            .media_url
            .as_deref()
            .ok_or(ResolutionError::MissingLocator)?;
        let key = self.resolver.resolve(locator)?;

        let workspace = JobWorkspace::create(&self.settings.work_dir)?;
        let result = self.run_stages(post, &key, &workspace).await;

        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            warn!("Failed to clean up {}: {}", path.display(), e);
        }

        result
    }

    async fn run_stages(
        &self,
        post: &Post,
        key: &str,
        workspace: &JobWorkspace,
    ) -> Result<String, PipelineError> {
        let input = workspace.input_path();

        info!(post_id = %post.id, "⬇️ Downloading {}/{}", self.resolver.bucket(), key);
        self.storage
            .download(self.resolver.bucket(), key, &input)
            .await
            .map_err(PipelineError::Download)?;

        info!(post_id = %post.id, "Transcoding post {} to HLS", post.id);
        let artifacts = self
            .transcoder
            .transcode(&input, &workspace.output_dir())
            .await?;

        let media_url = self
            .publisher
            .publish(self.storage.as_ref(), &post.id.to_string(), &artifacts)
            .await
            .map_err(PipelineError::Upload)?;

        Ok(media_url)
    }
}
