//! # Scheduler
//!
//! Named periodic tasks, each registered with an interval and its own
//! cancellation token. Nothing starts on its own: a task runs only after
//! `schedule` and stops on `cancel(name)` or `shutdown()`.
//!
//! ```text
//!  schedule(name, every, task)
//!        │
//!        ▼
//!  ┌──────────── loop ────────────┐
//!  │ tick ──→ task.run() ──→ tick │ ◀── cancel(name) / shutdown()
//!  └──────────────────────────────┘      ends the loop between runs
//! ```
//!
//! A failed run is logged and counted; the task keeps its schedule.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pm_telemetry::metrics::TASK_ERRORS;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Instrument};

/// Work the scheduler runs on an interval.
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Task {0} is already scheduled")]
    DuplicateTask(String),

    #[error("Task {0} needs a non-zero interval")]
    ZeroInterval(String),

    #[error("Scheduler is shut down")]
    ShutDown,
}

struct ScheduledTask {
    interval: Duration,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owner of every periodic task in the node.
pub struct Scheduler {
    tasks: Mutex<HashMap<String, ScheduledTask>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            tasks: Mutex::new(HashMap::new()),
            shutdown_tx,
        }
    }

    /// Start running `task` every `interval`, first run immediately.
    pub fn schedule(
        &self,
        name: impl Into<String>,
        interval: Duration,
        task: Arc<dyn PeriodicTask>,
    ) -> Result<(), SchedulerError> {
        let name = name.into();
        if *self.shutdown_tx.borrow() {
            return Err(SchedulerError::ShutDown);
        }
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval(name));
        }

        let mut tasks = self.tasks.lock();
        if tasks.get(&name).is_some_and(|t| !t.handle.is_finished()) {
            return Err(SchedulerError::DuplicateTask(name));
        }

        let (cancel, cancel_rx) = watch::channel(false);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let span = tracing::info_span!("task", name = %name);
        let handle = tokio::spawn(
            run_loop(name.clone(), interval, task, cancel_rx, shutdown_rx).instrument(span),
        );

        debug!(task = %name, interval_ms = interval.as_millis() as u64, "Task scheduled");
        tasks.insert(
            name,
            ScheduledTask {
                interval,
                cancel,
                handle,
            },
        );
        Ok(())
    }

    /// Stop one task after its current run. Returns false if no such task.
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.lock().remove(name) {
            Some(task) => {
                let _ = task.cancel.send(true);
                info!(task = name, "Task cancelled");
                true
            }
            None => false,
        }
    }

    /// Names of scheduled tasks, sorted.
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.tasks.lock().get(name).map(|t| t.interval)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .get(name)
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Stop every task and wait up to `grace` for them to finish.
    ///
    /// Tasks still running after the grace period are aborted.
    pub async fn shutdown(&self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);
        let drained: Vec<(String, ScheduledTask)> = self.tasks.lock().drain().collect();
        info!(tasks = drained.len(), "Stopping scheduled tasks");

        for (name, task) in drained {
            let abort = task.handle.abort_handle();
            if tokio::time::timeout(grace, task.handle).await.is_err() {
                warn!(task = %name, "Task did not stop within grace period, aborting");
                abort.abort();
            }
        }
    }
}

async fn run_loop(
    name: String,
    interval: Duration,
    task: Arc<dyn PeriodicTask>,
    mut cancel_rx: watch::Receiver<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = task.run().await {
                    TASK_ERRORS.with_label_values(&[name.as_str()]).inc();
                    warn!(task = %name, error = %e, "Task run failed");
                }
            }
            _ = cancel_rx.changed() => break,
            _ = shutdown_rx.changed() => break,
        }
    }
    debug!(task = %name, "Task stopped");
}
