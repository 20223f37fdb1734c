//! Polling worker loop for digest jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{info, instrument};
use uuid::Uuid;

use newswatch_core::{defaults, Error, Result};

use crate::executor::{DigestPipeline, ExecutionOutcome};

/// Event bus capacity for worker events.
const EVENT_BUS_CAPACITY: usize = 256;

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
    /// A job completed successfully.
    JobSucceeded { job_id: Uuid },
    /// A rate-limited job went back to the queue.
    JobRequeued {
        job_id: Uuid,
        attempt: i32,
        next_run_at: DateTime<Utc>,
    },
    /// A job failed terminally.
    JobFailed { job_id: Uuid, error: String },
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that drains the digest job queue, one job per tick.
pub struct JobWorker {
    pipeline: Arc<DigestPipeline>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    /// Create a new job worker.
    pub fn new(pipeline: Arc<DigestPipeline>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            pipeline,
            config,
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Job worker received shutdown signal");
                break;
            }

            match self.pipeline.process_next_job().await {
                Some((job_id, outcome)) => {
                    self.emit(job_id, outcome);
                    // Drain the queue without sleeping between jobs.
                }
                None => {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("Job worker received shutdown signal");
                            break;
                        }
                        _ = sleep(poll_interval) => {}
                    }
                }
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    fn emit(&self, job_id: Uuid, outcome: ExecutionOutcome) {
        let event = match outcome {
            ExecutionOutcome::Succeeded => WorkerEvent::JobSucceeded { job_id },
            ExecutionOutcome::Requeued {
                attempt,
                next_run_at,
            } => WorkerEvent::JobRequeued {
                job_id,
                attempt,
                next_run_at,
            },
            ExecutionOutcome::Failed { message } => WorkerEvent::JobFailed {
                job_id,
                error: message,
            },
            // Missing / AlreadyDone / NotClaimed are scheduler noise,
            // not client-visible transitions.
            _ => return,
        };
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, 500);
        assert!(config.enabled);
    }

    #[test]
    fn config_builders() {
        let config = WorkerConfig::default()
            .with_poll_interval(50)
            .with_enabled(false);
        assert_eq!(config.poll_interval_ms, 50);
        assert!(!config.enabled);
    }
}
