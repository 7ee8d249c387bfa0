//! # Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Build the container (every subsystem, once)
//! 3. Register Prometheus collectors and the genesis validator roster
//! 4. Start the event-metrics recorder and operator console
//! 5. Schedule the periodic tasks
//!
//! ## Shutdown Sequence
//!
//! 1. Stop scheduled tasks (grace period, then abort)
//! 2. Signal background listeners
//! 3. Exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use pm_telemetry::register_metrics;
use shared_types::OperatorAlert;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::container::{ConfigError, NodeConfig, NodeContainer};
use crate::genesis::bootstrap_roster;
use crate::handlers::NodeApi;
use crate::scheduler::Scheduler;
use crate::tasks::{register_tasks, MiningPipeline};
use crate::wiring::operator_console::AlertLog;
use crate::wiring::{spawn_event_metrics, spawn_operator_console};

/// Operator alerts kept for `NodeApi::recent_alerts`.
const ALERT_HISTORY: usize = 256;

/// The node: container, scheduler and background listeners.
pub struct NodeRuntime {
    container: Arc<NodeContainer>,
    scheduler: Scheduler,
    pipeline: Arc<MiningPipeline>,
    alert_log: Arc<AlertLog>,
    alerts: Mutex<Option<mpsc::UnboundedReceiver<OperatorAlert>>>,
    shutdown_tx: watch::Sender<bool>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl NodeRuntime {
    /// Validate `config` and build every subsystem.
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (container, alerts) = NodeContainer::new(config);
        Ok(Self::from_container(container, alerts))
    }

    /// Wrap an already-built container.
    pub fn from_container(
        container: NodeContainer,
        alerts: mpsc::UnboundedReceiver<OperatorAlert>,
    ) -> Self {
        let container = Arc::new(container);
        let pipeline = Arc::new(MiningPipeline::new(
            Arc::clone(&container.ledger),
            Arc::clone(&container.orchestrator),
        ));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            container,
            scheduler: Scheduler::new(),
            pipeline,
            alert_log: Arc::new(AlertLog::new(ALERT_HISTORY)),
            alerts: Mutex::new(Some(alerts)),
            shutdown_tx,
            background: Mutex::new(Vec::new()),
        }
    }

    /// Bootstrap the roster and start every task.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Productive-Mining Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Network: {}", self.container.config.node.network);
        info!("===========================================");

        register_metrics().context("Failed to register metrics")?;
        bootstrap_roster(
            &self.container.config.genesis,
            self.container.stake.as_ref(),
            self.container.research.as_ref(),
        )
        .await
        .context("Failed to bootstrap genesis roster")?;

        {
            let mut background = self.background.lock();
            background.push(spawn_event_metrics(
                Arc::clone(&self.container.event_bus),
                self.shutdown_tx.subscribe(),
            ));
            if let Some(alerts) = self.alerts.lock().take() {
                background.push(spawn_operator_console(
                    alerts,
                    Arc::clone(&self.alert_log),
                    self.shutdown_tx.subscribe(),
                ));
            }
        }

        let tasks = register_tasks(&self.container, &self.scheduler, Arc::clone(&self.pipeline))
            .context("Failed to schedule runtime tasks")?;
        info!(tasks = tasks.len(), "Runtime tasks scheduled");
        Ok(())
    }

    /// Stop tasks, then background listeners.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        let grace = Duration::from_millis(self.container.config.runtime.shutdown_grace_ms);
        self.scheduler.shutdown(grace).await;

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        let handles: Vec<JoinHandle<()>> = self.background.lock().drain(..).collect();
        for handle in handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout(grace, handle).await.is_err() {
                abort.abort();
            }
        }
        info!("Shutdown complete");
    }

    pub fn api(&self) -> NodeApi {
        NodeApi::new(
            Arc::clone(&self.container),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.alert_log),
        )
    }

    pub fn container(&self) -> Arc<NodeContainer> {
        Arc::clone(&self.container)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn pipeline(&self) -> Arc<MiningPipeline> {
        Arc::clone(&self.pipeline)
    }
}
