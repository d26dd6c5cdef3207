use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{ObjectStore, PublicUrlBuilder, StorageError, StorageResult, public_read_policy};
use crate::config::settings::StorageConfig;

const DEFAULT_REGION: &str = "us-east-1";

fn request_error<E: std::error::Error>(err: E) -> StorageError {
    StorageError::Request(DisplayErrorContext(err).to_string())
}

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    region: String,
    urls: PublicUrlBuilder,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Result<Self, url::ParseError> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "static",
        );

        let s3_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(s3_config);
        let urls = PublicUrlBuilder::new(&config.public_url, config.url_style)?;

        info!("✅ S3 client configured for {}", config.endpoint);

        Ok(Self {
            client,
            region: config.region.clone(),
            urls,
        })
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(request_error(err)),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut req = self.client.create_bucket().bucket(bucket);

        if self.region != DEFAULT_REGION {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        req.send().await.map_err(request_error)?;
        Ok(())
    }

    async fn set_public_read_policy(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(public_read_policy(bucket))
            .send()
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> StorageResult<()> {
        let resp = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(resp) => resp,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Err(StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(err) => return Err(request_error(err)),
        };

        let mut body = resp.body;
        let mut file = tokio::fs::File::create(local_path).await?;
        let mut written = 0usize;

        while let Some(chunk) = body.try_next().await.map_err(request_error)? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!("Downloaded {}/{} ({} bytes)", bucket, key, written);
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(request_error)?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(request_error)?;

        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.urls.object_url(bucket, key)
    }
}
