//! Walk counters

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters shared by every task of a walk
#[derive(Debug)]
pub struct WalkMetrics {
    /// `find_library` calls issued to providers
    pub find_requests: AtomicUsize,
    /// `get_dependencies` calls issued to providers
    pub dependency_requests: AtomicUsize,
    /// Lookups answered from the walk's memo
    pub cache_hits: AtomicUsize,
    /// Lookups that had to go to a provider
    pub cache_misses: AtomicUsize,
    /// Fetches retried after a source lost a listed package
    pub retries: AtomicUsize,
    /// Central versions injected under the root
    pub central_injections: AtomicUsize,
    /// Requests no provider could satisfy
    pub unresolved: AtomicUsize,
    start_time: Instant,
}

impl WalkMetrics {
    pub fn new() -> Self {
        Self {
            find_requests: AtomicUsize::new(0),
            dependency_requests: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
            central_injections: AtomicUsize::new(0),
            unresolved: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn inc_find_requests(&self) {
        self.find_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dependency_requests(&self) {
        self.dependency_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_central_injections(&self) {
        self.central_injections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unresolved(&self) {
        self.unresolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn summary(&self) -> MetricsSummary {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        MetricsSummary {
            elapsed_ms: self.elapsed().as_millis(),
            find_requests: self.find_requests.load(Ordering::Relaxed),
            dependency_requests: self.dependency_requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            central_injections: self.central_injections.load(Ordering::Relaxed),
            unresolved: self.unresolved.load(Ordering::Relaxed),
            cache_hit_rate: if hits + misses > 0 {
                (hits as f64 / (hits + misses) as f64) * 100.0
            } else {
                0.0
            },
        }
    }
}

impl Default for WalkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`WalkMetrics`]
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub elapsed_ms: u128,
    pub find_requests: usize,
    pub dependency_requests: usize,
    pub retries: usize,
    pub central_injections: usize,
    pub unresolved: usize,
    pub cache_hit_rate: f64,
}
