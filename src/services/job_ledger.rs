//! Duplicate suppression for job lifecycle events.
//!
//! The SDK may replay an event for a phase transition the service already
//! acted on. The ledger remembers which (job, stage) pairs were claimed so a
//! replay cannot trigger a second acceptance or a second delivery. Entries
//! are dropped when the job reaches a terminal phase, and the ledger is
//! capped so a bridge that never reports terminal phases cannot grow it
//! without bound.

use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::Mutex;

use crate::domain::models::JobId;

/// Lifecycle step the service performs at most once per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    Negotiation,
    Delivery,
}

#[derive(Debug, Default)]
struct LedgerState {
    claims: HashMap<JobId, HashSet<JobStage>>,
    /// Insertion order of job ids, oldest first.
    order: VecDeque<JobId>,
}

/// Bounded record of claimed lifecycle actions.
#[derive(Debug)]
pub struct JobLedger {
    capacity: usize,
    state: Mutex<LedgerState>,
}

impl JobLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Claim `stage` for `job_id`. Returns `false` if it was already claimed.
    pub async fn claim(&self, job_id: &JobId, stage: JobStage) -> bool {
        let mut state = self.state.lock().await;

        if let Some(stages) = state.claims.get_mut(job_id) {
            return stages.insert(stage);
        }

        while state.claims.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.claims.remove(&oldest);
        }

        state
            .claims
            .insert(job_id.clone(), HashSet::from([stage]));
        state.order.push_back(job_id.clone());
        true
    }

    /// Forget everything claimed for `job_id`.
    pub async fn release_job(&self, job_id: &JobId) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.claims.remove(job_id).is_some();
        if removed {
            state.order.retain(|id| id != job_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.claims.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_once_per_stage() {
        let ledger = JobLedger::new(16);
        let job = JobId::new("1");

        assert!(ledger.claim(&job, JobStage::Negotiation).await);
        assert!(!ledger.claim(&job, JobStage::Negotiation).await);
        assert!(ledger.claim(&job, JobStage::Delivery).await);
        assert!(!ledger.claim(&job, JobStage::Delivery).await);
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_release_allows_reclaim() {
        let ledger = JobLedger::new(16);
        let job = JobId::new("7");

        assert!(ledger.claim(&job, JobStage::Delivery).await);
        assert!(ledger.release_job(&job).await);
        assert!(!ledger.release_job(&job).await);
        assert!(ledger.is_empty().await);
        assert!(ledger.claim(&job, JobStage::Delivery).await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let ledger = JobLedger::new(2);
        let (a, b, c) = (JobId::new("a"), JobId::new("b"), JobId::new("c"));

        assert!(ledger.claim(&a, JobStage::Delivery).await);
        assert!(ledger.claim(&b, JobStage::Delivery).await);
        assert!(ledger.claim(&c, JobStage::Delivery).await);

        assert_eq!(ledger.len().await, 2);
        // `a` was evicted, so its claim is fresh again
        assert!(ledger.claim(&a, JobStage::Delivery).await);
        assert!(!ledger.claim(&c, JobStage::Delivery).await);
    }

    #[tokio::test]
    async fn test_concurrent_claims_single_winner() {
        let ledger = std::sync::Arc::new(JobLedger::new(16));
        let job = JobId::new("race");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = std::sync::Arc::clone(&ledger);
                let job = job.clone();
                tokio::spawn(async move { ledger.claim(&job, JobStage::Delivery).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
