use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Counters shared between the worker loop and the status endpoint.
#[derive(Debug, Default)]
pub struct WorkerStats {
    claimed: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    claims_lost: AtomicU64,
    current: Mutex<Option<Uuid>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub jobs_claimed: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub claims_lost: u64,
    pub current_post: Option<Uuid>,
}

impl WorkerStats {
    fn set_current(&self, id: Option<Uuid>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = id;
    }

    pub fn job_started(&self, id: Uuid) {
        self.claimed.fetch_add(1, Ordering::Relaxed);
        self.set_current(Some(id));
    }

    pub fn job_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.set_current(None);
    }

    pub fn job_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.set_current(None);
    }

    pub fn job_abandoned(&self) {
        self.set_current(None);
    }

    pub fn claim_lost(&self) {
        self.claims_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            jobs_claimed: self.claimed.load(Ordering::Relaxed),
            jobs_completed: self.completed.load(Ordering::Relaxed),
            jobs_failed: self.failed.load(Ordering::Relaxed),
            claims_lost: self.claims_lost.load(Ordering::Relaxed),
            current_post: *self.current.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}
