//! Service layer: classification, formatting, retry, duplicate suppression,
//! job counters and the job lifecycle handler that ties them together.

pub mod classifier;
pub mod formatter;
pub mod job_handler;
pub mod job_ledger;
pub mod job_metrics;
pub mod retry;

pub use classifier::classify;
pub use job_handler::{analyze, EventOutcome, HandlerSettings, JobAction, JobLifecycleHandler};
pub use job_ledger::{JobLedger, JobStage};
pub use job_metrics::{JobMetrics, JobOutcome, JobTicket, MetricsSnapshot};
pub use retry::RetryPolicy;
