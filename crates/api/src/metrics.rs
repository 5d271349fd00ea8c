use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_runs: AtomicUsize,
    successful_runs: AtomicUsize,
    failed_runs: AtomicUsize,

    // Timing (in microseconds)
    total_run_time_us: AtomicU64,

    // Counts
    chunks_attempted: AtomicUsize,
    chunks_failed: AtomicUsize,
    transactions_merged: AtomicUsize,
}

/// What one pipeline run contributed.
pub struct RunRecord {
    pub success: bool,
    pub duration: Duration,
    pub chunks_attempted: usize,
    pub chunks_failed: usize,
    pub transactions: usize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_runs: AtomicUsize::new(0),
            successful_runs: AtomicUsize::new(0),
            failed_runs: AtomicUsize::new(0),
            total_run_time_us: AtomicU64::new(0),
            chunks_attempted: AtomicUsize::new(0),
            chunks_failed: AtomicUsize::new(0),
            transactions_merged: AtomicUsize::new(0),
        })
    }

    pub fn record_run(&self, run: RunRecord) {
        self.total_runs.fetch_add(1, Ordering::Relaxed);
        if run.success {
            self.successful_runs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_runs.fetch_add(1, Ordering::Relaxed);
        }
        self.total_run_time_us.fetch_add(run.duration.as_micros() as u64, Ordering::Relaxed);
        self.chunks_attempted.fetch_add(run.chunks_attempted, Ordering::Relaxed);
        self.chunks_failed.fetch_add(run.chunks_failed, Ordering::Relaxed);
        self.transactions_merged.fetch_add(run.transactions, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let runs = self.total_runs.load(Ordering::Relaxed);
        let total_us = self.total_run_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            total_runs: runs,
            successful_runs: self.successful_runs.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
            avg_run_time_ms: if runs > 0 { total_us / runs as f64 / 1000.0 } else { 0.0 },
            chunks_attempted: self.chunks_attempted.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            transactions_merged: self.transactions_merged.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub avg_run_time_ms: f64,
    pub chunks_attempted: usize,
    pub chunks_failed: usize,
    pub transactions_merged: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
