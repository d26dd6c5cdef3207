use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ManifestError {
    #[error("missing #EXTM3U header")]
    MissingHeader,
}

/// The parts of an HLS media playlist the worker checks after encoding.
#[derive(Debug, Default, PartialEq)]
pub struct MediaPlaylist {
    /// Number of the first segment.
    pub media_sequence: u64,
    /// Segment URIs in playback order.
    pub segments: Vec<String>,
    pub end_list: bool,
}

impl MediaPlaylist {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());

        if lines.next() != Some("#EXTM3U") {
            return Err(ManifestError::MissingHeader);
        }

        let mut playlist = MediaPlaylist::default();
        for line in lines {
            if let Some(value) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
                playlist.media_sequence = value.parse().unwrap_or(0);
            } else if line == "#EXT-X-ENDLIST" {
                playlist.end_list = true;
            } else if !line.starts_with('#') {
                playlist.segments.push(line.to_string());
            }
        }

        Ok(playlist)
    }
}
