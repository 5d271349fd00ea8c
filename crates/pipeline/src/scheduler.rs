use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::PipelineError;

/// Pause between consecutive submissions unless configured otherwise.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_secs(90);

#[derive(Debug)]
pub struct ChunkOutcome<T, E> {
    pub index: usize,
    pub result: Result<T, E>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub index: usize,
    pub reason: String,
}

/// Usable results in submission order, plus what failed along the way.
#[derive(Debug)]
pub struct ScheduleReport<T> {
    pub attempted: usize,
    pub results: Vec<(usize, T)>,
    pub failures: Vec<ChunkFailure>,
}

/// Submits work items strictly one at a time with a fixed pause between them.
#[derive(Debug, Clone, Copy)]
pub struct ChunkScheduler {
    delay: Duration,
}

impl Default for ChunkScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_DELAY)
    }
}

impl ChunkScheduler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Submit every item in order. A failed item is recorded, never fatal.
    pub async fn run<I, T, E, F, Fut>(&self, items: Vec<I>, mut submit: F) -> Vec<ChunkOutcome<T, E>>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let total = items.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, item) in items.into_iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                info!(
                    next_chunk = index,
                    delay_secs = self.delay.as_secs_f64(),
                    "Waiting before next submission"
                );
                sleep(self.delay).await;
            }

            info!(chunk = index, total, "Submitting chunk");
            let result = submit(item).await;

            match &result {
                Ok(_) => info!(chunk = index, total, "Chunk succeeded"),
                Err(e) => warn!(chunk = index, total, error = %e, "Chunk submission failed"),
            }

            outcomes.push(ChunkOutcome { index, result });
        }

        outcomes
    }

    /// Run every item and apply the pipeline's failure rules.
    ///
    /// A lone item's failure is returned as-is; with several items the run
    /// only fails when none of them succeeded.
    pub async fn schedule<I, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        submit: F,
    ) -> Result<ScheduleReport<T>, PipelineError>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempted = items.len();
        if attempted == 0 {
            return Err(PipelineError::NoChunks);
        }

        // A single item never waits, whatever the configured delay
        let scheduler = if attempted == 1 {
            Self::new(Duration::ZERO)
        } else {
            *self
        };

        let mut results = Vec::new();
        let mut failures = Vec::new();

        for outcome in scheduler.run(items, submit).await {
            match outcome.result {
                Ok(value) => results.push((outcome.index, value)),
                Err(e) => failures.push(ChunkFailure {
                    index: outcome.index,
                    reason: e.to_string(),
                }),
            }
        }

        if attempted == 1 {
            if let Some(failure) = failures.pop() {
                return Err(PipelineError::ChunkSubmissionFailed {
                    index: failure.index,
                    reason: failure.reason,
                });
            }
        }

        if results.is_empty() {
            return Err(PipelineError::NoUsableResults { attempted });
        }

        Ok(ScheduleReport {
            attempted,
            results,
            failures,
        })
    }
}
