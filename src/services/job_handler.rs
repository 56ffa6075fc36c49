//! Job lifecycle handling.
//!
//! The protocol SDK reports every phase change of every job. Only two of
//! them need a reaction from a seller:
//!
//! | phase       | memo announces | action                          |
//! |-------------|----------------|---------------------------------|
//! | REQUEST     | NEGOTIATION    | accept the negotiation          |
//! | TRANSACTION | EVALUATION     | run the delivery pipeline       |
//! | terminal    | (any)          | forget the job                  |
//!
//! Everything else is ignored. The delivery pipeline always ends in exactly
//! one deliver call, carrying either the analysis or an error payload.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::JobError;
use crate::domain::models::{
    Config, Deliverable, ErrorDelivery, FormattedResponse, Job, JobPhase, ServiceKind,
};
use crate::domain::ports::{AnalysisSource, ProtocolClient};
use crate::services::classifier::classify;
use crate::services::formatter;
use crate::services::job_ledger::{JobLedger, JobStage};
use crate::services::job_metrics::JobMetrics;
use crate::services::retry::RetryPolicy;

/// Reaction chosen for a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    AcceptNegotiation,
    Deliver,
    Forget,
    Ignore,
}

impl JobAction {
    /// Decide what to do with `job` from its phase and memos.
    pub fn plan(job: &Job) -> Self {
        match job.phase {
            JobPhase::Request if job.has_memo_to(JobPhase::Negotiation) => Self::AcceptNegotiation,
            JobPhase::Transaction if job.has_memo_to(JobPhase::Evaluation) => Self::Deliver,
            phase if phase.is_terminal() => Self::Forget,
            _ => Self::Ignore,
        }
    }
}

/// What handling an event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Negotiation accepted.
    Accepted,
    /// The SDK declined or failed to record the acceptance.
    AcceptFailed,
    /// Analysis delivered.
    Delivered(ServiceKind),
    /// Error payload delivered in place of the analysis.
    ErrorDelivered(ServiceKind),
    /// The deliver call itself failed; nothing reached the buyer.
    DeliveryFailed(ServiceKind),
    /// The event repeated an action already taken for this job.
    Duplicate,
    /// Terminal phase; job state released.
    Forgotten,
    /// Nothing to do for this phase.
    Ignored,
    /// Handling panicked.
    Unhandled,
}

/// Tunables for [`JobLifecycleHandler`].
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// Budget for fetching (including retries) one analysis
    pub deadline: Duration,
    /// Delivery pipelines allowed to fetch concurrently
    pub max_concurrent_jobs: usize,
    /// Job ids remembered for duplicate suppression
    pub dedup_capacity: usize,
    pub retry: RetryPolicy,
}

impl HandlerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            deadline: Duration::from_secs(config.jobs.deadline_secs),
            max_concurrent_jobs: config.jobs.max_concurrent_jobs,
            dedup_capacity: config.jobs.dedup_capacity,
            retry: RetryPolicy::from(&config.upstream.retry),
        }
    }
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Reacts to protocol job events on behalf of the seller.
pub struct JobLifecycleHandler {
    protocol: Arc<dyn ProtocolClient>,
    source: Arc<dyn AnalysisSource>,
    metrics: Arc<JobMetrics>,
    ledger: JobLedger,
    permits: Semaphore,
    tasks: TaskTracker,
    deadline: Duration,
    retry: RetryPolicy,
}

impl JobLifecycleHandler {
    pub fn new(
        protocol: Arc<dyn ProtocolClient>,
        source: Arc<dyn AnalysisSource>,
        metrics: Arc<JobMetrics>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            protocol,
            source,
            metrics,
            ledger: JobLedger::new(settings.dedup_capacity),
            permits: Semaphore::new(settings.max_concurrent_jobs.max(1)),
            tasks: TaskTracker::new(),
            deadline: settings.deadline,
            retry: settings.retry,
        }
    }

    pub fn metrics(&self) -> &Arc<JobMetrics> {
        &self.metrics
    }

    /// Handle `job` on its own task.
    ///
    /// A panic while handling is logged and reported as
    /// [`EventOutcome::Unhandled`]; it never propagates to the caller.
    pub fn dispatch(self: &Arc<Self>, job: Job) -> JoinHandle<EventOutcome> {
        let handler = Arc::clone(self);
        self.tasks.spawn(async move {
            let job_id = job.id.clone();
            match AssertUnwindSafe(handler.handle_event(job))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let err = JobError::Unhandled(panic_message(panic.as_ref()));
                    error!(job_id = %job_id, category = err.category(), error = %err, "job handling aborted");
                    EventOutcome::Unhandled
                }
            }
        })
    }

    /// Wait for every dispatched event to finish, including negotiations
    /// and deliveries still waiting on the ledger or a permit.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    /// Events dispatched and not yet finished.
    pub fn in_flight_events(&self) -> usize {
        self.tasks.len()
    }

    /// Handle a single lifecycle event to completion.
    #[instrument(skip(self, job), fields(job_id = %job.id, phase = %job.phase))]
    pub async fn handle_event(&self, job: Job) -> EventOutcome {
        let action = JobAction::plan(&job);
        debug!(?action, memos = job.memos.len(), "job event received");

        match action {
            JobAction::AcceptNegotiation => {
                if !self.ledger.claim(&job.id, JobStage::Negotiation).await {
                    return self.duplicate("negotiation");
                }
                self.accept(&job).await
            }
            JobAction::Deliver => {
                if !self.ledger.claim(&job.id, JobStage::Delivery).await {
                    return self.duplicate("delivery");
                }
                self.deliver(&job).await
            }
            JobAction::Forget => {
                if self.ledger.release_job(&job.id).await {
                    debug!("job reached terminal phase, released");
                }
                EventOutcome::Forgotten
            }
            JobAction::Ignore => EventOutcome::Ignored,
        }
    }

    /// Fetch and format the latest analysis for `kind` within the deadline.
    pub async fn run_analysis(&self, kind: ServiceKind) -> Result<FormattedResponse, JobError> {
        let metrics = &self.metrics;
        analyze(self.source.as_ref(), &self.retry, self.deadline, kind, || {
            metrics.record_upstream_request();
        })
        .await
    }

    fn duplicate(&self, stage: &'static str) -> EventOutcome {
        self.metrics.record_duplicate_event();
        info!(stage, "duplicate job event skipped");
        EventOutcome::Duplicate
    }

    async fn accept(&self, job: &Job) -> EventOutcome {
        let kind = classify(job.service_requirement.as_ref());
        let reason = format!("Accepting {kind} request");

        match self.protocol.accept(job, &reason).await {
            Ok(true) => {
                self.metrics.record_negotiation_accepted();
                info!(service = %kind, "negotiation accepted");
                EventOutcome::Accepted
            }
            Ok(false) => {
                self.metrics.record_negotiation_failed();
                warn!(service = %kind, "protocol did not record the acceptance");
                EventOutcome::AcceptFailed
            }
            Err(err) => {
                self.metrics.record_negotiation_failed();
                // Let a replayed event retry the acceptance.
                self.ledger.release_job(&job.id).await;
                error!(service = %kind, error = %err, "failed to accept negotiation");
                EventOutcome::AcceptFailed
            }
        }
    }

    async fn deliver(&self, job: &Job) -> EventOutcome {
        let ticket = self.metrics.begin_job();
        let kind = classify(job.service_requirement.as_ref());
        info!(service = %kind, "processing delivery");

        // The semaphore is never closed; if it were, the buyer still gets
        // an error payload.
        let analysis = match self.permits.acquire().await {
            Ok(_permit) => self.run_analysis(kind).await.and_then(|response| {
                Deliverable::json_text(&response)
                    .map_err(|e| JobError::Unhandled(format!("failed to serialize response: {e}")))
            }),
            Err(_) => Err(JobError::Unhandled("job permits closed".to_string())),
        };

        let (deliverable, analysis_ok) = match analysis {
            Ok(deliverable) => (deliverable, true),
            Err(err) => {
                warn!(service = %kind, category = err.category(), error = %err, "analysis failed, delivering error");
                match Deliverable::json_text(&ErrorDelivery::new(kind, err.buyer_message(kind))) {
                    Ok(deliverable) => (deliverable, false),
                    Err(e) => {
                        error!(error = %e, "failed to serialize error delivery");
                        ticket.fail();
                        return EventOutcome::DeliveryFailed(kind);
                    }
                }
            }
        };

        if let Err(err) = self.protocol.deliver(job, &deliverable).await {
            let err = JobError::DeliveryTransport(err);
            self.metrics.record_delivery_error();
            error!(service = %kind, category = err.category(), error = %err, "delivery call failed");
            ticket.fail();
            return EventOutcome::DeliveryFailed(kind);
        }

        if analysis_ok {
            info!(service = %kind, "analysis delivered");
            ticket.succeed();
            EventOutcome::Delivered(kind)
        } else {
            info!(service = %kind, "error payload delivered");
            ticket.fail();
            EventOutcome::ErrorDelivered(kind)
        }
    }
}

/// Fetch `kind` from `source` with retries, bounded by `deadline`, and format it.
///
/// Deadline expiry drops the in-flight request, so a late upstream
/// response can never produce a second delivery. `on_attempt` runs before
/// every upstream call.
pub async fn analyze(
    source: &dyn AnalysisSource,
    retry: &RetryPolicy,
    deadline: Duration,
    kind: ServiceKind,
    mut on_attempt: impl FnMut(),
) -> Result<FormattedResponse, JobError> {
    let fetch = retry.execute(move || {
        on_attempt();
        source.fetch(kind)
    });

    let payload = match tokio::time::timeout(deadline, fetch).await {
        Ok(Ok(payload)) => payload,
        Ok(Err(source)) => return Err(JobError::UpstreamUnavailable { kind, source }),
        Err(_) => return Err(JobError::UpstreamTimeout { kind, deadline }),
    };

    Ok(formatter::format(kind, &payload)?)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
