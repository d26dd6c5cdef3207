//! Recovering the raw-upload object key from a post's stored `media_url`.
//!
//! Uploads are recorded as full URLs, and the URL shape depends on how the
//! object store is exposed: path-style (`http://host/videos/u1/a.mp4`),
//! virtual-host style (`https://videos.host/u1/a.mp4`) or behind a CDN that
//! maps its root onto the bucket (`https://cdn.host/u1/a.mp4`).

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error("post has no media url")]
    MissingLocator,

    #[error("'{locator}' is not a valid url: {source}")]
    InvalidLocator {
        locator: String,
        source: url::ParseError,
    },

    #[error("unsupported locator scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("no object key in '{0}'")]
    NoKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    BucketInPath,
    VirtualHost,
    TrailingPath,
}

const STRATEGIES: [Strategy; 3] = [
    Strategy::BucketInPath,
    Strategy::VirtualHost,
    Strategy::TrailingPath,
];

impl Strategy {
    fn extract<'a>(&self, url: &'a Url, buckets: &BucketNames) -> Option<&'a str> {
        let path = url.path();
        let bucket = buckets.source.as_str();
        match self {
            Strategy::BucketInPath => {
                let marker = format!("/{}/", bucket);
                path.find(&marker).map(|at| &path[at + marker.len()..])
            }
            Strategy::VirtualHost => {
                let host = url.host_str()?;
                is_bucket_host(host, bucket).then(|| path.trim_start_matches('/'))
            }
            Strategy::TrailingPath => {
                let trimmed = path.trim_start_matches('/');
                let first_segment = trimmed.split('/').next().unwrap_or_default();
                let names_a_bucket = buckets.all().any(|name| {
                    first_segment == name || url.host_str().is_some_and(|h| is_bucket_host(h, name))
                });
                (!names_a_bucket).then_some(trimmed)
            }
        }
    }
}

fn is_bucket_host(host: &str, bucket: &str) -> bool {
    host == bucket
        || host
            .strip_prefix(bucket)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Decoded key, or `None` when the candidate cannot name an object.
fn as_object_key(candidate: &str) -> Option<String> {
    if candidate.is_empty() || candidate.ends_with('/') {
        return None;
    }
    let decoded = urlencoding::decode(candidate).ok()?;
    let has_bad_segment = decoded
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    (!has_bad_segment).then(|| decoded.into_owned())
}

#[derive(Debug, Clone)]
struct BucketNames {
    source: String,
    foreign: Vec<String>,
}

impl BucketNames {
    fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.source.as_str()).chain(self.foreign.iter().map(String::as_str))
    }
}

/// Maps stored locators onto keys in the raw-upload bucket.
///
/// Buckets registered with [`SourceResolver::with_foreign_bucket`] are never
/// mistaken for a CDN root: a locator pointing into one of them does not resolve.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    buckets: BucketNames,
}

impl SourceResolver {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            buckets: BucketNames {
                source: bucket.into(),
                foreign: Vec::new(),
            },
        }
    }

    pub fn with_foreign_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.buckets.foreign.push(bucket.into());
        self
    }

    pub fn bucket(&self) -> &str {
        &self.buckets.source
    }

    /// Object key of `locator` in the source bucket, trying each URL shape in turn.
    pub fn resolve(&self, locator: &str) -> Result<String, ResolutionError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(ResolutionError::MissingLocator);
        }

        let url = Url::parse(locator).map_err(|source| ResolutionError::InvalidLocator {
            locator: locator.to_string(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ResolutionError::UnsupportedScheme(url.scheme().to_string()));
        }

        STRATEGIES
            .iter()
            .filter_map(|strategy| strategy.extract(&url, &self.buckets))
            .find_map(as_object_key)
            .ok_or_else(|| ResolutionError::NoKey(locator.to_string()))
    }
}
