use tracing::{debug, info};

use super::artifacts::{Artifact, ArtifactSet};
use crate::infrastructure::storage::{ObjectStore, StorageError};

pub const MANIFEST_CONTENT_TYPE: &str = "application/x-mpegURL";
pub const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

/// Uploads artifact sets to the output bucket under `<prefix>/<file name>`.
pub struct OutputPublisher {
    bucket: String,
}

impl OutputPublisher {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    pub fn object_key(prefix: &str, artifact: &Artifact) -> String {
        format!("{}/{}", prefix, artifact.file_name)
    }

    /// Upload every artifact and return the public locator of the manifest.
    /// `prefix` is the post id.
    ///
    /// Segments go first and the manifest last, so a readable manifest always
    /// points at segments that exist. Any failed upload aborts the publish.
    pub async fn publish<S: ObjectStore + ?Sized>(
        &self,
        store: &S,
        prefix: &str,
        artifacts: &ArtifactSet,
    ) -> Result<String, StorageError> {
        for segment in &artifacts.segments {
            let key = Self::object_key(prefix, segment);
            store
                .upload(&self.bucket, &key, &segment.path, SEGMENT_CONTENT_TYPE)
                .await?;
            debug!(post_id = prefix, "Uploaded HLS file: {}", key);
        }

        let manifest_key = Self::object_key(prefix, &artifacts.manifest);
        store
            .upload(
                &self.bucket,
                &manifest_key,
                &artifacts.manifest.path,
                MANIFEST_CONTENT_TYPE,
            )
            .await?;

        info!(
            post_id = prefix,
            "⬆️ Uploaded {} HLS file(s) to {}/{}",
            artifacts.file_count(),
            self.bucket,
            prefix
        );

        Ok(store.public_url(&self.bucket, &manifest_key))
    }
}
