use thiserror::Error;

use super::engine::TranscodeError;
use super::source::ResolutionError;
use crate::infrastructure::storage::StorageError;

/// Why a claimed post ended up FAILED. Only logged, never persisted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot resolve source object: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("download failed: {0}")]
    Download(#[source] StorageError),

    #[error("transcode failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("work directory error: {0}")]
    Workspace(#[from] std::io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Resolution(_) => "resolution",
            PipelineError::Download(_) => "download",
            PipelineError::Transcode(_) => "transcode",
            PipelineError::Upload(_) => "upload",
            PipelineError::Workspace(_) => "workspace",
        }
    }
}
