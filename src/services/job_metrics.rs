//! Job counters shared between the lifecycle handler and the monitoring
//! surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-lifetime job counters.
///
/// Counters only grow, except `active_jobs`, which is adjusted exclusively
/// through [`JobTicket`] so every pipeline entry is settled exactly once.
#[derive(Debug)]
pub struct JobMetrics {
    jobs_processed: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    active_jobs: AtomicU64,
    negotiations_accepted: AtomicU64,
    negotiations_failed: AtomicU64,
    delivery_errors: AtomicU64,
    duplicate_events: AtomicU64,
    upstream_requests: AtomicU64,
    started_at: Instant,
    started_at_utc: DateTime<Utc>,
}

impl Default for JobMetrics {
    fn default() -> Self {
        Self {
            jobs_processed: AtomicU64::new(0),
            jobs_succeeded: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            active_jobs: AtomicU64::new(0),
            negotiations_accepted: AtomicU64::new(0),
            negotiations_failed: AtomicU64::new(0),
            delivery_errors: AtomicU64::new(0),
            duplicate_events: AtomicU64::new(0),
            upstream_requests: AtomicU64::new(0),
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub active_jobs: u64,
    pub negotiations_accepted: u64,
    pub negotiations_failed: u64,
    pub delivery_errors: u64,
    pub duplicate_events: u64,
    pub upstream_requests: u64,
    pub uptime_secs: u64,
    pub started_at: DateTime<Utc>,
    pub captured_at: DateTime<Utc>,
}

/// How a pipeline entry ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
}

impl JobMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count a new pipeline entry and mark it in flight.
    pub fn begin_job(self: &Arc<Self>) -> JobTicket {
        self.jobs_processed.fetch_add(1, Ordering::Relaxed);
        self.active_jobs.fetch_add(1, Ordering::SeqCst);
        JobTicket {
            metrics: Arc::clone(self),
            outcome: None,
        }
    }

    pub fn record_negotiation_accepted(&self) {
        self.negotiations_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_negotiation_failed(&self) {
        self.negotiations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_error(&self) {
        self.delivery_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_event(&self) {
        self.duplicate_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_request(&self) {
        self.upstream_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_jobs(&self) -> u64 {
        self.active_jobs.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        // Outcome counters are read before `processed` so a concurrent
        // settlement can never make succeeded + failed exceed processed.
        let jobs_succeeded = self.jobs_succeeded.load(Ordering::SeqCst);
        let jobs_failed = self.jobs_failed.load(Ordering::SeqCst);
        let active_jobs = self.active_jobs.load(Ordering::SeqCst);
        let jobs_processed = self.jobs_processed.load(Ordering::SeqCst);

        MetricsSnapshot {
            jobs_processed,
            jobs_succeeded,
            jobs_failed,
            active_jobs,
            negotiations_accepted: self.negotiations_accepted.load(Ordering::Relaxed),
            negotiations_failed: self.negotiations_failed.load(Ordering::Relaxed),
            delivery_errors: self.delivery_errors.load(Ordering::Relaxed),
            duplicate_events: self.duplicate_events.load(Ordering::Relaxed),
            upstream_requests: self.upstream_requests.load(Ordering::Relaxed),
            uptime_secs: self.started_at.elapsed().as_secs(),
            started_at: self.started_at_utc,
            captured_at: Utc::now(),
        }
    }

    fn settle(&self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => self.jobs_succeeded.fetch_add(1, Ordering::SeqCst),
            JobOutcome::Failed => self.jobs_failed.fetch_add(1, Ordering::SeqCst),
        };
        self.active_jobs.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-flight marker for one pipeline entry.
///
/// The ticket settles on drop: an outcome recorded with [`JobTicket::succeed`]
/// or [`JobTicket::fail`] is counted, and a ticket dropped without one (an
/// early return or a panic unwinding through the pipeline) counts as a
/// failure. Either way `active_jobs` is decremented exactly once.
#[derive(Debug)]
pub struct JobTicket {
    metrics: Arc<JobMetrics>,
    outcome: Option<JobOutcome>,
}

impl JobTicket {
    pub fn succeed(mut self) {
        self.outcome = Some(JobOutcome::Succeeded);
    }

    pub fn fail(mut self) {
        self.outcome = Some(JobOutcome::Failed);
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        self.metrics
            .settle(self.outcome.unwrap_or(JobOutcome::Failed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_success_path() {
        let metrics = JobMetrics::new();
        let ticket = metrics.begin_job();
        assert_eq!(metrics.active_jobs(), 1);

        ticket.succeed();
        let snap = metrics.snapshot();
        assert_eq!(snap.jobs_processed, 1);
        assert_eq!(snap.jobs_succeeded, 1);
        assert_eq!(snap.jobs_failed, 0);
        assert_eq!(snap.active_jobs, 0);
    }

    #[test]
    fn test_ticket_failure_and_drop_paths() {
        let metrics = JobMetrics::new();
        metrics.begin_job().fail();
        drop(metrics.begin_job());

        let snap = metrics.snapshot();
        assert_eq!(snap.jobs_processed, 2);
        assert_eq!(snap.jobs_failed, 2);
        assert_eq!(snap.active_jobs, 0);
    }

    #[test]
    fn test_ticket_settles_during_panic() {
        let metrics = JobMetrics::new();
        let m = Arc::clone(&metrics);
        let result = std::panic::catch_unwind(move || {
            let _ticket = m.begin_job();
            panic!("pipeline blew up");
        });

        assert!(result.is_err());
        assert_eq!(metrics.active_jobs(), 0);
        assert_eq!(metrics.snapshot().jobs_failed, 1);
    }

    #[tokio::test]
    async fn test_concurrent_tickets_balance() {
        let metrics = JobMetrics::new();
        let mut handles = Vec::new();

        for i in 0..64 {
            let metrics = Arc::clone(&metrics);
            handles.push(tokio::spawn(async move {
                let ticket = metrics.begin_job();
                tokio::task::yield_now().await;
                if i % 3 == 0 {
                    ticket.fail();
                } else {
                    ticket.succeed();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.jobs_processed, 64);
        assert_eq!(snap.jobs_succeeded + snap.jobs_failed, 64);
        assert_eq!(snap.jobs_failed, 22);
        assert_eq!(snap.active_jobs, 0);
    }

    #[test]
    fn test_auxiliary_counters() {
        let metrics = JobMetrics::new();
        metrics.record_negotiation_accepted();
        metrics.record_negotiation_failed();
        metrics.record_delivery_error();
        metrics.record_duplicate_event();
        metrics.record_upstream_request();
        metrics.record_upstream_request();

        let snap = metrics.snapshot();
        assert_eq!(snap.negotiations_accepted, 1);
        assert_eq!(snap.negotiations_failed, 1);
        assert_eq!(snap.delivery_errors, 1);
        assert_eq!(snap.duplicate_events, 1);
        assert_eq!(snap.upstream_requests, 2);
        assert!(snap.captured_at >= snap.started_at);
    }
}
