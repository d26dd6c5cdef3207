use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::engine::TranscodeError;
use super::manifest::MediaPlaylist;

pub const MANIFEST_EXTENSION: &str = "m3u8";

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub path: PathBuf,
}

/// One encoder run: a manifest plus the segments it lists, in playback order.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub manifest: Artifact,
    pub segments: Vec<Artifact>,
}

impl ArtifactSet {
    /// Build the set from whatever the encoder left in `dir`.
    ///
    /// File names are not known up front, so the directory listing is the
    /// source of truth; the manifest must reference exactly those files.
    pub async fn discover(dir: &Path) -> Result<Self, TranscodeError> {
        let mut manifests = Vec::new();
        let mut others = BTreeSet::new();

        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let is_manifest = Path::new(&file_name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXTENSION));
            if is_manifest {
                manifests.push(file_name);
            } else {
                others.insert(file_name);
            }
        }

        let manifest_name = match manifests.len() {
            0 => return Err(TranscodeError::MissingManifest),
            1 => manifests.remove(0),
            _ => {
                manifests.sort();
                return Err(TranscodeError::MultipleManifests(manifests));
            }
        };

        let manifest_path = dir.join(&manifest_name);
        let content = tokio::fs::read_to_string(&manifest_path).await?;
        let playlist = MediaPlaylist::parse(&content)?;

        if playlist.segments.is_empty() {
            return Err(TranscodeError::NoSegments);
        }
        if !playlist.end_list {
            return Err(TranscodeError::UnterminatedPlaylist);
        }
        if playlist.media_sequence != 0 {
            return Err(TranscodeError::MediaSequence(playlist.media_sequence));
        }

        let listed: BTreeSet<&str> = playlist.segments.iter().map(String::as_str).collect();
        let missing: Vec<String> = listed
            .iter()
            .filter(|name| !others.contains(**name))
            .map(|name| name.to_string())
            .collect();
        let unlisted: Vec<String> = others
            .iter()
            .filter(|name| !listed.contains(name.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() || !unlisted.is_empty() {
            return Err(TranscodeError::ManifestMismatch { missing, unlisted });
        }

        let segments = playlist
            .segments
            .iter()
            .map(|name| Artifact {
                file_name: name.clone(),
                path: dir.join(name),
            })
            .collect();

        Ok(Self {
            manifest: Artifact {
                file_name: manifest_name,
                path: manifest_path,
            },
            segments,
        })
    }

    pub fn file_count(&self) -> usize {
        self.segments.len() + 1
    }
}
