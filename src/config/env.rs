use std::env;
use std::str::FromStr;

pub enum EnvKey {
    DatabaseUrl,
    MinioUrl,
    MinioRegion,
    MinioAccessKey,
    MinioSecretKey,
    MinioPublicUrl,
    MinioUrlStyle,
    RawBucket,
    HlsBucket,
    PollIntervalSecs,
    StartupDelaySecs,
    WorkDir,
    FfmpegPath,
    SegmentSeconds,
    HealthPort,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioRegion => "MINIO_REGION",
            EnvKey::MinioAccessKey => "MINIO_ROOT_USER",
            EnvKey::MinioSecretKey => "MINIO_ROOT_PASSWORD",
            EnvKey::MinioPublicUrl => "MINIO_PUBLIC_URL",
            EnvKey::MinioUrlStyle => "MINIO_URL_STYLE",
            EnvKey::RawBucket => "MINIO_VIDEOS_BUCKET",
            EnvKey::HlsBucket => "MINIO_HLS_BUCKET",
            EnvKey::PollIntervalSecs => "WORKER_POLL_INTERVAL_SECS",
            EnvKey::StartupDelaySecs => "WORKER_STARTUP_DELAY_SECS",
            EnvKey::WorkDir => "WORKER_WORK_DIR",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::SegmentSeconds => "HLS_SEGMENT_SECONDS",
            EnvKey::HealthPort => "WORKER_HEALTH_PORT",
        }
    }
}

/// A source of configuration variables.
pub trait Vars {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment (after `dotenv`).
pub struct ProcessEnv;

impl Vars for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

#[cfg(test)]
impl Vars for std::collections::HashMap<&str, &str> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).map(|value| value.to_string())
    }
}

pub fn get(vars: &impl Vars, key: EnvKey) -> Result<String, env::VarError> {
    vars.var(key.as_str()).ok_or(env::VarError::NotPresent)
}

pub fn get_or(vars: &impl Vars, key: EnvKey, default: &str) -> String {
    vars.var(key.as_str()).unwrap_or_else(|| default.to_string())
}

/// Parsed value of `key`, or `default` when it is unset or does not parse.
pub fn get_parsed<T: FromStr>(vars: &impl Vars, key: EnvKey, default: T) -> T {
    match get(vars, key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
