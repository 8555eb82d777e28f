//! One-slot maintenance worker.
//!
//! The worker drains a queue of capacity one and runs each request to
//! completion before taking the next. Requests carry the [`UpdateGuard`] of
//! the orchestrator that admitted them; the guard is dropped after the run
//! finishes, whatever its outcome.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use sevi_core::{defaults, Error, Result};

use crate::handler::{MaintenanceContext, MaintenanceHandler, MaintenanceOp, MaintenanceResult};
use crate::orchestrator::UpdateGuard;

/// Event emitted by the maintenance worker.
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceEvent {
    /// A run was started.
    Started { run_id: Uuid, op: MaintenanceOp },
    /// Run progress was updated.
    Progress {
        run_id: Uuid,
        percent: i32,
        message: Option<String>,
    },
    /// A run completed successfully.
    Completed {
        run_id: Uuid,
        op: MaintenanceOp,
        duration_ms: u64,
    },
    /// A run failed.
    Failed {
        run_id: Uuid,
        op: MaintenanceOp,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// A maintenance run admitted by the orchestrator.
pub(crate) struct MaintenanceRequest {
    pub(crate) ctx: MaintenanceContext,
    pub(crate) reply: oneshot::Sender<MaintenanceResult>,
    pub(crate) guard: UpdateGuard,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    submit_tx: mpsc::Sender<MaintenanceRequest>,
    event_tx: broadcast::Sender<MaintenanceEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down after the current run.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<MaintenanceEvent> {
        self.event_tx.subscribe()
    }

    /// Queue a request. Fails when the slot is taken or the worker is gone.
    pub(crate) fn submit(&self, request: MaintenanceRequest) -> Result<()> {
        self.submit_tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::UpdateOngoing,
            mpsc::error::TrySendError::Closed(_) => {
                Error::Internal("Maintenance worker is not running".into())
            }
        })
    }
}

/// Worker that executes maintenance runs one at a time.
pub struct MaintenanceWorker {
    handler: Arc<dyn MaintenanceHandler>,
    event_tx: broadcast::Sender<MaintenanceEvent>,
}

impl MaintenanceWorker {
    pub fn new(handler: Arc<dyn MaintenanceHandler>) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self { handler, event_tx }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let (submit_tx, mut submit_rx) = mpsc::channel(1);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            self.run(&mut submit_rx, &mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            submit_tx,
            event_tx,
        }
    }

    #[instrument(skip_all)]
    async fn run(
        &self,
        submit_rx: &mut mpsc::Receiver<MaintenanceRequest>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) {
        info!("Maintenance worker started");
        let _ = self.event_tx.send(MaintenanceEvent::WorkerStarted);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Maintenance worker received shutdown signal");
                    break;
                }
                request = submit_rx.recv() => match request {
                    Some(request) => self.execute(request).await,
                    None => break,
                },
            }
        }

        let _ = self.event_tx.send(MaintenanceEvent::WorkerStopped);
        info!("Maintenance worker stopped");
    }

    async fn execute(&self, request: MaintenanceRequest) {
        let MaintenanceRequest { ctx, reply, guard } = request;
        let start = Instant::now();
        let run_id = ctx.run_id;
        let op = ctx.op;

        info!(%run_id, op = op.name(), "Maintenance started");
        let _ = self.event_tx.send(MaintenanceEvent::Started { run_id, op });

        let event_tx = self.event_tx.clone();
        let ctx = ctx.with_progress_callback(move |percent, message| {
            let _ = event_tx.send(MaintenanceEvent::Progress {
                run_id,
                percent,
                message: message.map(String::from),
            });
        });

        // Spawned so a panicking handler still releases the guard.
        let handler = self.handler.clone();
        let result = match tokio::spawn(async move { handler.execute(ctx).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(%run_id, error = ?e, "Maintenance task panicked");
                MaintenanceResult::Failed(format!("Maintenance task panicked: {}", e))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            MaintenanceResult::Success(_) => {
                info!(%run_id, op = op.name(), duration_ms, "Maintenance completed");
                let _ = self.event_tx.send(MaintenanceEvent::Completed {
                    run_id,
                    op,
                    duration_ms,
                });
            }
            MaintenanceResult::Failed(error) => {
                error!(%run_id, op = op.name(), %error, duration_ms, "Maintenance failed");
                let _ = self.event_tx.send(MaintenanceEvent::Failed {
                    run_id,
                    op,
                    error: error.clone(),
                });
            }
        }

        drop(guard);
        if reply.send(result).is_err() {
            debug!(%run_id, "Maintenance caller stopped waiting before completion");
        }
    }
}
