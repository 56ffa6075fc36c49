//! Agent runtime: wires configuration, clients and the lifecycle handler,
//! runs the monitoring server, and shuts down gracefully.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::models::{Config, ServiceKind};
use crate::domain::ports::{AnalysisSource, ProtocolClient, SellerRegistration};
use crate::infrastructure::acp::AcpBridgeClient;
use crate::infrastructure::monitoring::{MonitoringServer, MonitoringState, ServiceInfo};
use crate::infrastructure::upstream::UpstreamClient;
use crate::services::{HandlerSettings, JobLifecycleHandler, JobMetrics};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The running seller agent.
pub struct AgentRuntime {
    config: Config,
    protocol: Arc<dyn ProtocolClient>,
    handler: Arc<JobLifecycleHandler>,
    shutdown: CancellationToken,
}

impl AgentRuntime {
    /// Build the runtime with the HTTP adapters described by `config`.
    pub fn build(config: Config) -> Result<Self> {
        let protocol = AcpBridgeClient::new(&config.acp, &config.agent)
            .context("Failed to create ACP bridge client")?;
        let source = UpstreamClient::from_config(&config.upstream)
            .context("Failed to create upstream analysis client")?;

        Ok(Self::with_ports(config, Arc::new(protocol), Arc::new(source)))
    }

    /// Build the runtime around caller-provided ports.
    pub fn with_ports(
        config: Config,
        protocol: Arc<dyn ProtocolClient>,
        source: Arc<dyn AnalysisSource>,
    ) -> Self {
        let handler = Arc::new(JobLifecycleHandler::new(
            Arc::clone(&protocol),
            source,
            JobMetrics::new(),
            HandlerSettings::from_config(&config),
        ));

        Self {
            config,
            protocol,
            handler,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn handler(&self) -> &Arc<JobLifecycleHandler> {
        &self.handler
    }

    /// Token that stops the runtime when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until SIGINT, SIGTERM, a cancelled shutdown token, or a server
    /// failure, then drain in-flight jobs.
    ///
    /// # Errors
    /// Fails when start-up fails, when the server stopped on its own, or when
    /// jobs were still in flight after the grace period.
    pub async fn run(self) -> Result<()> {
        let state = Arc::new(MonitoringState::new(
            Arc::clone(&self.handler),
            ServiceInfo::from_config(&self.config),
        ));
        let server = MonitoringServer::new(Arc::clone(&state), self.config.server.clone());
        let listener = server.bind().await?;

        let token = self.shutdown.clone();
        let mut server_task = tokio::spawn(
            server.serve_with_shutdown(listener, token.clone().cancelled_owned()),
        );

        if self.config.acp.register_on_start {
            if let Err(err) = self.register().await {
                token.cancel();
                let _ = server_task.await;
                return Err(err);
            }
        }

        state.mark_initialized();
        info!(
            agent = %self.config.agent.name,
            wallet = %self.config.agent.wallet_address,
            max_concurrent_jobs = self.config.jobs.max_concurrent_jobs,
            "seller agent ready"
        );

        let mut fatal = None;
        tokio::select! {
            () = shutdown_signal() => info!("shutdown signal received"),
            () = token.cancelled() => info!("shutdown requested"),
            joined = &mut server_task => {
                let err = match joined {
                    Ok(Ok(())) => anyhow::anyhow!("Monitoring server stopped unexpectedly"),
                    Ok(Err(err)) => err,
                    Err(join_err) => anyhow::Error::new(join_err).context("Monitoring server task failed"),
                };
                error!(error = %err, "fatal server failure, shutting down");
                fatal = Some(err);
            }
        }

        token.cancel();
        if fatal.is_none() {
            match server_task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "monitoring server stopped with error"),
                Err(err) => warn!(error = %err, "monitoring server task failed"),
            }
        }

        let grace = Duration::from_secs(self.config.server.shutdown_grace_secs);
        let drained = wait_idle(&self.handler, grace).await;
        let snapshot = self.handler.metrics().snapshot();
        info!(
            jobs_processed = snapshot.jobs_processed,
            jobs_succeeded = snapshot.jobs_succeeded,
            jobs_failed = snapshot.jobs_failed,
            active_jobs = snapshot.active_jobs,
            "seller agent stopped"
        );

        if let Some(err) = fatal {
            return Err(err);
        }
        if !drained {
            anyhow::bail!(
                "Shutdown grace period of {}s expired with {} event(s) in flight",
                grace.as_secs(),
                self.handler.in_flight_events()
            );
        }
        Ok(())
    }

    async fn register(&self) -> Result<()> {
        let registration = SellerRegistration {
            name: self.config.agent.name.clone(),
            wallet_address: self.config.agent.wallet_address.clone(),
            entity_id: self.config.agent.entity_id,
            services: ServiceKind::all().map(|kind| kind.name().to_string()).collect(),
        };

        self.protocol
            .register(&registration)
            .await
            .context("Failed to register seller with the ACP bridge")
    }
}

/// Wait until every dispatched event has finished and no job ticket is
/// open, for at most `grace`.
///
/// Returns `false` when the grace period expired first.
pub async fn wait_idle(handler: &JobLifecycleHandler, grace: Duration) -> bool {
    let drained = timeout(grace, async {
        handler.drain().await;
        tickets_settled(handler.metrics()).await;
    })
    .await;

    drained.is_ok()
}

async fn tickets_settled(metrics: &JobMetrics) {
    let mut ticker = interval(IDLE_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let active = metrics.active_jobs();
        if active == 0 {
            break;
        }
        info!(active_jobs = active, "waiting for in-flight jobs");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
