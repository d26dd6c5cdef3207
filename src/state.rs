use std::sync::Arc;

use crate::workers::stats::WorkerStats;

#[derive(Clone)]
pub struct AppState {
    pub hls_bucket: String,
    pub stats: Arc<WorkerStats>,
}

impl AppState {
    pub fn new(hls_bucket: String, stats: Arc<WorkerStats>) -> Self {
        Self { hls_bucket, stats }
    }
}
