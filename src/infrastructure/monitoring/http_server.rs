//! Monitoring HTTP server.
//!
//! Exposes health, service info, job metrics and a direct analysis probe,
//! and receives job events forwarded by the protocol SDK bridge.

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::models::{Config, ErrorDelivery, Job, JobId, ServerConfig, ServiceKind};
use crate::services::{JobLifecycleHandler, MetricsSnapshot};

/// Static description of the running agent, served by `/info`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: &'static str,
    pub services: Vec<&'static str>,
    pub wallet_address: String,
    pub max_concurrent_jobs: usize,
    pub deadline_secs: u64,
}

impl ServiceInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.agent.name.clone(),
            version: env!("CARGO_PKG_VERSION"),
            services: ServiceKind::all().map(ServiceKind::name).collect(),
            wallet_address: config.agent.wallet_address.clone(),
            max_concurrent_jobs: config.jobs.max_concurrent_jobs,
            deadline_secs: config.jobs.deadline_secs,
        }
    }
}

/// Shared state for the monitoring server.
pub struct MonitoringState {
    handler: Arc<JobLifecycleHandler>,
    info: ServiceInfo,
    initialized: AtomicBool,
}

impl MonitoringState {
    pub fn new(handler: Arc<JobLifecycleHandler>, info: ServiceInfo) -> Self {
        Self {
            handler,
            info,
            initialized: AtomicBool::new(false),
        }
    }

    /// Flip `/health` to healthy.
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

/// Monitoring HTTP server.
pub struct MonitoringServer {
    state: Arc<MonitoringState>,
    config: ServerConfig,
}

impl MonitoringServer {
    pub fn new(state: Arc<MonitoringState>, config: ServerConfig) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> Arc<MonitoringState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all endpoints.
    pub fn build_router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.config.host, self.config.port))?;
        TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind monitoring server on {addr}"))
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        if let Ok(addr) = listener.local_addr() {
            info!("Monitoring server listening on {}", addr);
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Monitoring server failed")
    }
}

pub fn build_router(state: Arc<MonitoringState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(service_info))
        .route("/metrics", get(metrics))
        .route("/test/{kind}", get(test_analysis))
        .route("/acp/jobs", post(receive_job))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Error response structure.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl ErrorResponse {
    fn reply(status: StatusCode, code: &'static str, error: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                error: error.into(),
                code,
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
    active_jobs: u64,
}

#[derive(Debug, Serialize)]
struct JobAccepted {
    accepted: bool,
    job_id: JobId,
}

async fn health_check(State(state): State<Arc<MonitoringState>>) -> impl IntoResponse {
    let (status, label) = if state.is_initialized() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            service: state.info.name.clone(),
            active_jobs: state.handler.metrics().active_jobs(),
        }),
    )
}

async fn service_info(State(state): State<Arc<MonitoringState>>) -> Json<ServiceInfo> {
    Json(state.info.clone())
}

async fn metrics(State(state): State<Arc<MonitoringState>>) -> Json<MetricsSnapshot> {
    Json(state.handler.metrics().snapshot())
}

async fn test_analysis(
    State(state): State<Arc<MonitoringState>>,
    Path(kind): Path<String>,
) -> Response {
    let Ok(kind) = kind.parse::<ServiceKind>() else {
        return ErrorResponse::reply(
            StatusCode::NOT_FOUND,
            "UNKNOWN_SERVICE",
            format!("Unknown service: {kind}"),
        );
    };

    match state.handler.run_analysis(kind).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            warn!(service = %kind, category = err.category(), error = %err, "test analysis failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorDelivery::new(kind, err.buyer_message(kind))),
            )
                .into_response()
        }
    }
}

async fn receive_job(
    State(state): State<Arc<MonitoringState>>,
    payload: Result<Json<Job>, JsonRejection>,
) -> Response {
    let job = match payload {
        Ok(Json(job)) => job,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected malformed job event");
            return ErrorResponse::reply(
                StatusCode::BAD_REQUEST,
                "INVALID_JOB",
                rejection.body_text(),
            );
        }
    };

    let job_id = job.id.clone();
    // Outcome is logged by the handler; the bridge only needs the ack.
    drop(state.handler.dispatch(job));

    (
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            accepted: true,
            job_id,
        }),
    )
        .into_response()
}
