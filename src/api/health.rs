//! Shared request counters for the /health endpoint.
//! Updated by the grades handler on every response.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::StatusCode;

#[derive(Default)]
pub struct HealthState {
    /// Responses served by /api/grades.
    pub requests_served: AtomicU64,
    /// Of those, how many were not-found (missing snapshot/date/race).
    pub not_found: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_response(&self, status: StatusCode) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        if status == StatusCode::NOT_FOUND {
            self.not_found.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served.load(Ordering::Relaxed)
    }

    pub fn not_found(&self) -> u64 {
        self.not_found.load(Ordering::Relaxed)
    }
}
