pub mod s3;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("storage request failed: {0}")]
    Request(String),

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// The slice of the object store the worker relies on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn set_public_read_policy(&self, bucket: &str) -> StorageResult<()>;

    /// Stream `bucket/key` into a local file, creating or truncating it.
    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> StorageResult<()>;

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Anonymous `s3:GetObject` on every object of the bucket.
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": { "AWS": ["*"] },
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{}/*", bucket)]
            }
        ]
    })
    .to_string()
}

/// Make sure the output bucket exists and is world-readable.
///
/// Provisioning problems are logged and swallowed: the bucket may already be
/// managed out of band, and uploads will surface any real problem per job.
pub async fn ensure_public_bucket<S: ObjectStore + ?Sized>(store: &S, bucket: &str) {
    match store.bucket_exists(bucket).await {
        Ok(true) => info!("Bucket '{}' already exists", bucket),
        Ok(false) => {
            if let Err(e) = store.create_bucket(bucket).await {
                error!("Failed to create bucket '{}': {}", bucket, e);
                return;
            }
            if let Err(e) = store.set_public_read_policy(bucket).await {
                error!("Failed to set public policy on '{}': {}", bucket, e);
                return;
            }
            info!("✅ Bucket '{}' created with public read policy", bucket);
        }
        Err(e) => error!("Error checking bucket '{}': {}", bucket, e),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlStyle {
    /// `<base>/<bucket>/<key>`
    Path,
    /// `<scheme>://<bucket>.<host>/<key>`
    VirtualHost,
    /// `<base>/<key>`, the CDN maps its root onto the bucket.
    Cdn,
}

impl FromStr for UrlStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(UrlStyle::Path),
            "virtual-host" | "virtual_host" | "virtual" => Ok(UrlStyle::VirtualHost),
            "cdn" => Ok(UrlStyle::Cdn),
            other => Err(format!("unknown url style '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PublicUrlBuilder {
    base: Url,
    style: UrlStyle,
}

impl PublicUrlBuilder {
    pub fn new(base: &str, style: UrlStyle) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base)?,
            style,
        })
    }

    fn base_str(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match self.style {
            UrlStyle::Path => format!("{}/{}/{}", self.base_str(), bucket, key),
            UrlStyle::VirtualHost => {
                let host = self.base.host_str().unwrap_or_default();
                let port = self
                    .base
                    .port()
                    .map(|p| format!(":{}", p))
                    .unwrap_or_default();
                format!("{}://{}.{}{}/{}", self.base.scheme(), bucket, host, port, key)
            }
            UrlStyle::Cdn => format!("{}/{}", self.base_str(), key),
        }
    }
}
