//! In-memory stand-ins for the job table, the object store and ffmpeg.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use time::{Date, Month, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::infrastructure::storage::{ObjectStore, StorageError, StorageResult};
use crate::modules::post::model::{Post, PostKind, ProcessingStatus};
use crate::modules::post::repository::JobStore;
use crate::modules::transcode::artifacts::ArtifactSet;
use crate::modules::transcode::engine::{MANIFEST_NAME, TranscodeError, Transcoder};

fn created_at(offset_secs: i64) -> PrimitiveDateTime {
    let base = PrimitiveDateTime::new(
        Date::from_calendar_date(2024, Month::January, 1).unwrap(),
        Time::MIDNIGHT,
    );
    base + time::Duration::seconds(offset_secs)
}

pub fn post_at(media_url: &str, offset_secs: i64) -> Post {
    Post {
        id: Uuid::new_v4(),
        kind: Some(PostKind::Video.as_str().to_string()),
        media_url: Some(media_url.to_string()),
        processing_status: Some(ProcessingStatus::Pending.as_str().to_string()),
        created_at: Some(created_at(offset_secs)),
    }
}

pub fn image_post_at(media_url: &str, offset_secs: i64) -> Post {
    Post {
        kind: Some(PostKind::Image.as_str().to_string()),
        ..post_at(media_url, offset_secs)
    }
}

pub struct MemoryJobStore {
    posts: Mutex<Vec<Post>>,
    racy: bool,
    outages: Mutex<usize>,
}

impl MemoryJobStore {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
            racy: false,
            outages: Mutex::new(0),
        }
    }

    /// Yields between reading a pending post and returning it, so two
    /// concurrent pollers both see the same post before either claims it.
    pub fn racy(posts: Vec<Post>) -> Self {
        Self {
            racy: true,
            ..Self::new(posts)
        }
    }

    /// The next `n` reads fail as if the database were down.
    pub fn unavailable_for(self, n: usize) -> Self {
        *self.outages.lock().unwrap() = n;
        self
    }

    pub fn get(&self, id: Uuid) -> Post {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .expect("post exists")
    }

    fn transition(
        &self,
        id: Uuid,
        from: ProcessingStatus,
        to: ProcessingStatus,
        media_url: Option<&str>,
    ) -> Result<bool> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("no post {}", id))?;
        if post.status() != Some(from) {
            return Ok(false);
        }
        post.processing_status = Some(to.as_str().to_string());
        if let Some(url) = media_url {
            post.media_url = Some(url.to_string());
        }
        Ok(true)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn next_pending(&self, kind: PostKind) -> Result<Option<Post>> {
        {
            let mut outages = self.outages.lock().unwrap();
            if *outages > 0 {
                *outages -= 1;
                bail!("connection refused");
            }
        }

        let next = {
            let posts = self.posts.lock().unwrap();
            posts
                .iter()
                .filter(|p| p.kind.as_deref() == Some(kind.as_str()))
                .filter(|p| p.status() == Some(ProcessingStatus::Pending))
                .min_by_key(|p| p.created_at)
                .cloned()
        };

        if self.racy {
            tokio::task::yield_now().await;
        }
        Ok(next)
    }

    async fn claim(&self, id: Uuid) -> Result<bool> {
        self.transition(id, ProcessingStatus::Pending, ProcessingStatus::Processing, None)
    }

    async fn complete(&self, id: Uuid, media_url: &str) -> Result<()> {
        if !self.transition(
            id,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            Some(media_url),
        )? {
            bail!("post {} is no longer PROCESSING", id);
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid) -> Result<()> {
        if !self.transition(id, ProcessingStatus::Processing, ProcessingStatus::Failed, None)? {
            bail!("post {} is no longer PROCESSING", id);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    buckets: Mutex<HashMap<String, usize>>,
    upload_log: Mutex<Vec<String>>,
    fail_suffix: Option<String>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_uploads_ending_with(mut self, suffix: &str) -> Self {
        self.fail_suffix = Some(suffix.to_string());
        self
    }

    pub fn put(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: data.to_vec(),
                content_type: "video/mp4".to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn upload_log(&self) -> Vec<String> {
        self.upload_log.lock().unwrap().clone()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains_key(bucket)
    }

    pub fn policy_calls(&self, bucket: &str) -> usize {
        self.buckets.lock().unwrap().get(bucket).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        Ok(self.has_bucket(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.buckets.lock().unwrap().insert(bucket.to_string(), 0);
        Ok(())
    }

    async fn set_public_read_policy(&self, bucket: &str) -> StorageResult<()> {
        *self
            .buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default() += 1;
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> StorageResult<()> {
        let object = self.object(bucket, key).ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        tokio::fs::write(local_path, object.data).await?;
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        if self
            .fail_suffix
            .as_deref()
            .is_some_and(|suffix| key.ends_with(suffix))
        {
            return Err(StorageError::Request(format!("injected failure for {}", key)));
        }

        let data = tokio::fs::read(local_path).await?;
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        self.upload_log
            .lock()
            .unwrap()
            .push(format!("{}/{}", bucket, key));
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://public/{}/{}", bucket, key)
    }
}

/// Writes a well-formed playlist and `segments` segment files, like ffmpeg would.
pub struct FakeTranscoder {
    segments: usize,
    fail: bool,
    inputs: Mutex<Vec<Vec<u8>>>,
}

impl FakeTranscoder {
    pub fn producing(segments: usize) -> Self {
        Self {
            segments,
            fail: false,
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::producing(0)
        }
    }

    pub fn inputs_seen(&self) -> Vec<Vec<u8>> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<ArtifactSet, TranscodeError> {
        let data = tokio::fs::read(input).await?;
        self.inputs.lock().unwrap().push(data);

        if self.fail {
            // Partial output, as a crashed encoder would leave behind.
            tokio::fs::write(output_dir.join("segment_000.ts"), b"partial").await?;
            return Err(TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                diagnostics: "moov atom not found".to_string(),
            });
        }

        let mut manifest = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n#EXT-X-MEDIA-SEQUENCE:0\n");
        for i in 0..self.segments {
            let name = format!("segment_{:03}.ts", i);
            tokio::fs::write(output_dir.join(&name), format!("ts-{}", i)).await?;
            manifest.push_str("#EXTINF:10.000000,\n");
            manifest.push_str(&name);
            manifest.push('\n');
        }
        manifest.push_str("#EXT-X-ENDLIST\n");
        tokio::fs::write(output_dir.join(MANIFEST_NAME), manifest).await?;

        ArtifactSet::discover(output_dir).await
    }
}
