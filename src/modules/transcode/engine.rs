use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use super::artifacts::ArtifactSet;
use super::manifest::ManifestError;

pub const MANIFEST_NAME: &str = "index.m3u8";
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";

/// Keep only the tail of encoder output; ffmpeg puts the actual error last.
const DIAGNOSTIC_LIMIT: usize = 4096;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start encoder '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("encoder exited with {status}: {diagnostics}")]
    Failed { status: String, diagnostics: String },

    #[error("encoder produced no manifest")]
    MissingManifest,

    #[error("encoder produced several manifests: {0:?}")]
    MultipleManifests(Vec<String>),

    #[error("manifest lists no segments")]
    NoSegments,

    #[error("manifest has no #EXT-X-ENDLIST")]
    UnterminatedPlaylist,

    #[error("manifest starts at media sequence {0}, expected 0")]
    MediaSequence(u64),

    #[error("manifest and output disagree (missing: {missing:?}, unlisted: {unlisted:?})")]
    ManifestMismatch {
        missing: Vec<String>,
        unlisted: Vec<String>,
    },

    #[error("unreadable manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("output directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns one local input file into an HLS artifact set inside `output_dir`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<ArtifactSet, TranscodeError>;
}

#[derive(Debug, Clone)]
pub struct HlsParams {
    pub video_codec: String,
    pub profile: String,
    pub level: String,
    pub audio_codec: String,
    pub segment_seconds: u32,
}

impl Default for HlsParams {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            profile: "baseline".to_string(),
            level: "3.0".to_string(),
            audio_codec: "aac".to_string(),
            segment_seconds: 10,
        }
    }
}

pub struct FfmpegTranscoder {
    program: PathBuf,
    params: HlsParams,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>, params: HlsParams) -> Self {
        Self {
            program: program.into(),
            params,
        }
    }

    /// Single-tier static playlist: numbering from 0, every segment kept.
    pub fn build_args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        let p = &self.params;
        let hls_time = p.segment_seconds.to_string();
        let mut args: Vec<OsString> = [
            "-y",
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        args.push(input.as_os_str().to_owned());

        for arg in [
            "-c:v",
            p.video_codec.as_str(),
            "-profile:v",
            p.profile.as_str(),
            "-level",
            p.level.as_str(),
            "-c:a",
            p.audio_codec.as_str(),
            "-start_number",
            "0",
            "-hls_time",
            hls_time.as_str(),
            "-hls_list_size",
            "0",
            "-hls_playlist_type",
            "vod",
            "-hls_segment_filename",
        ] {
            args.push(OsString::from(arg));
        }

        args.push(output_dir.join(SEGMENT_PATTERN).into_os_string());
        args.push(OsString::from("-f"));
        args.push(OsString::from("hls"));
        args.push(output_dir.join(MANIFEST_NAME).into_os_string());
        args
    }
}

fn tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    match text.char_indices().rev().nth(DIAGNOSTIC_LIMIT) {
        Some((cut, _)) => format!("...{}", &text[cut..]),
        None => text.to_string(),
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<ArtifactSet, TranscodeError> {
        let args = self.build_args(input, output_dir);
        debug!("Running {} {:?}", self.program.display(), args);

        // No timeout: a stalled encoder holds the worker until it exits.
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let mut diagnostics = tail(&output.stderr);
            if diagnostics.is_empty() {
                diagnostics = tail(&output.stdout);
            }
            return Err(TranscodeError::Failed {
                status: output.status.to_string(),
                diagnostics,
            });
        }

        let artifacts = ArtifactSet::discover(output_dir).await?;
        info!(
            "🎞️ Encoded {} segment(s) into {}",
            artifacts.segments.len(),
            output_dir.display()
        );
        Ok(artifacts)
    }
}
