//! Shared fakes for the protocol and upstream ports.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use acp_analyst::domain::errors::{ProtocolError, UpstreamError};
use acp_analyst::domain::models::{Deliverable, Job, JobPhase, Memo, ServiceKind};
use acp_analyst::domain::ports::{AnalysisSource, ProtocolClient, SellerRegistration};
use acp_analyst::services::{HandlerSettings, JobLifecycleHandler, JobMetrics, RetryPolicy};
use async_trait::async_trait;
use serde_json::Value;

/// Protocol client that records every call.
#[derive(Default)]
pub struct RecordingProtocol {
    pub accept_result: Mutex<Option<Result<bool, ProtocolError>>>,
    pub fail_deliveries: bool,
    pub accept_delay: Option<Duration>,
    pub accepts: Mutex<Vec<(String, String)>>,
    pub deliveries: Mutex<Vec<(String, Deliverable)>>,
    pub registrations: Mutex<Vec<SellerRegistration>>,
}

impl RecordingProtocol {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_deliveries() -> Arc<Self> {
        Arc::new(Self {
            fail_deliveries: true,
            ..Default::default()
        })
    }

    pub fn with_accept_result(result: Result<bool, ProtocolError>) -> Arc<Self> {
        Arc::new(Self {
            accept_result: Mutex::new(Some(result)),
            ..Default::default()
        })
    }

    /// Acceptances take `delay` to complete and are recorded afterwards.
    pub fn with_accept_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            accept_delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn deliveries(&self) -> Vec<(String, Deliverable)> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Parsed JSON of every delivered value.
    pub fn delivered_json(&self) -> Vec<Value> {
        self.deliveries()
            .into_iter()
            .map(|(_, d)| serde_json::from_str(&d.value).unwrap())
            .collect()
    }

    pub fn accepts(&self) -> Vec<(String, String)> {
        self.accepts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProtocolClient for RecordingProtocol {
    async fn register(&self, registration: &SellerRegistration) -> Result<(), ProtocolError> {
        self.registrations.lock().unwrap().push(registration.clone());
        Ok(())
    }

    async fn accept(&self, job: &Job, reason: &str) -> Result<bool, ProtocolError> {
        if let Some(delay) = self.accept_delay {
            tokio::time::sleep(delay).await;
        }
        self.accepts
            .lock()
            .unwrap()
            .push((job.id.to_string(), reason.to_string()));
        self.accept_result.lock().unwrap().clone().unwrap_or(Ok(true))
    }

    async fn deliver(&self, job: &Job, deliverable: &Deliverable) -> Result<(), ProtocolError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((job.id.to_string(), deliverable.clone()));
        if self.fail_deliveries {
            return Err(ProtocolError::Network("bridge unreachable".to_string()));
        }
        Ok(())
    }
}

/// Scripted upstream behavior.
#[derive(Clone)]
pub enum Script {
    Respond(Value),
    Fail(UpstreamError),
    Delay(Duration, Value),
    Panic,
}

/// Analysis source that follows a script and tracks concurrency.
pub struct ScriptedSource {
    script: Script,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisSource for ScriptedSource {
    async fn fetch(&self, _kind: ServiceKind) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match &self.script {
            Script::Respond(value) => Ok(value.clone()),
            Script::Fail(err) => Err(err.clone()),
            Script::Delay(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(value.clone())
            }
            Script::Panic => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("upstream exploded");
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn settings(deadline: Duration, max_concurrent_jobs: usize) -> HandlerSettings {
    HandlerSettings {
        deadline,
        max_concurrent_jobs,
        dedup_capacity: 1000,
        retry: RetryPolicy::none(),
    }
}

pub fn handler(
    protocol: Arc<RecordingProtocol>,
    source: Arc<ScriptedSource>,
    settings: HandlerSettings,
) -> Arc<JobLifecycleHandler> {
    Arc::new(JobLifecycleHandler::new(
        protocol,
        source,
        JobMetrics::new(),
        settings,
    ))
}

/// A TRANSACTION event announcing EVALUATION.
pub fn transaction_job(id: u64, requirement: Value) -> Job {
    Job::new(id, JobPhase::Transaction)
        .with_requirement(requirement)
        .with_memo(Memo::with_next_phase(JobPhase::Evaluation))
}

/// A REQUEST event announcing NEGOTIATION.
pub fn request_job(id: u64, requirement: Value) -> Job {
    Job::new(id, JobPhase::Request)
        .with_requirement(requirement)
        .with_memo(Memo::with_next_phase(JobPhase::Negotiation))
}

pub fn black_swan_payload() -> Value {
    serde_json::json!({
        "score": 75,
        "analysis": "Elevated tail risk",
        "reasoning": ["x"],
        "confidence": "high",
        "certainty": 80,
        "timestamp": 1_700_000_000_000_i64,
        "lastRun": "2024-01-01T00:00:00Z",
        "currentMarketIndicators": ["y"],
        "primaryRiskFactors": ["z"]
    })
}
