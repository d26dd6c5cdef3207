use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use serde::Serialize;

use crate::common::response::{ApiResponse, ApiSuccess};
use crate::state::AppState;
use crate::workers::stats::StatsSnapshot;

#[derive(Serialize)]
pub struct WorkerStatus {
    pub output_bucket: String,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

pub fn configure_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", api_routes())
}

fn api_routes() -> Router<AppState> {
    Router::new().route("/worker/stats", get(worker_stats))
}

async fn worker_stats(State(state): State<AppState>) -> ApiSuccess<ApiResponse<WorkerStatus>> {
    let status = WorkerStatus {
        output_bucket: state.hls_bucket.clone(),
        stats: state.stats.snapshot(),
    };
    ApiSuccess(ApiResponse::success(status, "Worker stats"), StatusCode::OK)
}
