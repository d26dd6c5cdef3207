use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::env::{self, EnvKey, ProcessEnv, Vars};
use crate::infrastructure::storage::UrlStyle;

#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub public_url: String,
    pub url_style: UrlStyle,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorkerConfig {
    pub database_url: String,
    pub storage: StorageConfig,
    pub raw_bucket: String,
    pub hls_bucket: String,
    pub poll_interval: Duration,
    pub startup_delay: Duration,
    pub work_dir: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub segment_seconds: u32,
    pub health_port: u16,
}

impl WorkerConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Self::from_vars(&ProcessEnv)
    }

    pub fn from_vars(vars: &impl Vars) -> Result<Self, std::env::VarError> {
        let work_dir = env::get(vars, EnvKey::WorkDir)
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        Ok(Self {
            database_url: env::get(vars, EnvKey::DatabaseUrl)?,
            storage: StorageConfig {
                endpoint: env::get_or(vars, EnvKey::MinioUrl, "http://medgram-storage:9000"),
                region: env::get_or(vars, EnvKey::MinioRegion, "us-east-1"),
                access_key: env::get_or(vars, EnvKey::MinioAccessKey, "minio_admin"),
                secret_key: env::get_or(vars, EnvKey::MinioSecretKey, "secure_minio_password_change_me"),
                public_url: env::get_or(vars, EnvKey::MinioPublicUrl, "http://localhost:9000"),
                url_style: env::get_parsed(vars, EnvKey::MinioUrlStyle, UrlStyle::Path),
            },
            raw_bucket: env::get_or(vars, EnvKey::RawBucket, "videos"),
            hls_bucket: env::get_or(vars, EnvKey::HlsBucket, "hls"),
            poll_interval: Duration::from_secs(env::get_parsed(vars, EnvKey::PollIntervalSecs, 5)),
            startup_delay: Duration::from_secs(env::get_parsed(vars, EnvKey::StartupDelaySecs, 10)),
            work_dir,
            ffmpeg_path: PathBuf::from(env::get_or(vars, EnvKey::FfmpegPath, "ffmpeg")),
            segment_seconds: env::get_parsed(vars, EnvKey::SegmentSeconds, 10),
            health_port: env::get_parsed(vars, EnvKey::HealthPort, 3001),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let vars = HashMap::from([("DATABASE_URL", "postgres://db/app")]);
        let config = WorkerConfig::from_vars(&vars).unwrap();

        assert_eq!(config.database_url, "postgres://db/app");
        assert_eq!(config.raw_bucket, "videos");
        assert_eq!(config.hls_bucket, "hls");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.startup_delay, Duration::from_secs(10));
        assert_eq!(config.segment_seconds, 10);
        assert_eq!(config.health_port, 3001);
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.work_dir, std::env::temp_dir());
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.storage.public_url, "http://localhost:9000");
        assert_eq!(config.storage.url_style, UrlStyle::Path);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let vars = HashMap::from([("MINIO_HLS_BUCKET", "streams")]);
        assert_eq!(
            WorkerConfig::from_vars(&vars).unwrap_err(),
            std::env::VarError::NotPresent
        );
    }

    #[test]
    fn overrides_are_read_and_bad_numbers_fall_back() {
        let vars = HashMap::from([
            ("DATABASE_URL", "postgres://db/app"),
            ("MINIO_VIDEOS_BUCKET", "raw"),
            ("MINIO_URL_STYLE", "cdn"),
            ("WORKER_POLL_INTERVAL_SECS", "2"),
            ("HLS_SEGMENT_SECONDS", "six"),
            ("WORKER_WORK_DIR", "/scratch"),
        ]);
        let config = WorkerConfig::from_vars(&vars).unwrap();

        assert_eq!(config.raw_bucket, "raw");
        assert_eq!(config.storage.url_style, UrlStyle::Cdn);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.segment_seconds, 10);
        assert_eq!(config.work_dir, PathBuf::from("/scratch"));
    }
}
