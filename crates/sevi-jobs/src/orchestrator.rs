//! Single-flight admission of maintenance operations.
//!
//! One process-wide flag records whether a maintenance operation is in
//! flight. Admission is a compare-and-swap on that flag, so of any number of
//! concurrent requests exactly one wins; the rest are rejected with
//! [`Error::UpdateOngoing`] without anything being scheduled. The winner's
//! [`UpdateGuard`] travels with the work and clears the flag when the run
//! finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use sevi_core::{Error, Result};

use crate::handler::{MaintenanceContext, MaintenanceOp, MaintenanceResult};
use crate::worker::{MaintenanceEvent, MaintenanceRequest, WorkerHandle};

/// Ownership of the update flag. Dropping it clears the flag.
#[derive(Debug)]
pub struct UpdateGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Outcome of a maintenance request as reported to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResponse {
    /// The operation finished within the wait.
    Completed(Option<JsonValue>),
    /// The operation finished with an error within the wait.
    Failed(String),
    /// The wait elapsed; the operation keeps running.
    Accepted { run_id: Uuid },
    /// Another operation was in flight; nothing was scheduled.
    Conflict,
}

impl UpdateResponse {
    pub fn is_conflict(&self) -> bool {
        matches!(self, UpdateResponse::Conflict)
    }
}

/// An admitted maintenance run.
#[derive(Debug)]
pub struct MaintenanceTicket {
    run_id: Uuid,
    op: MaintenanceOp,
    rx: oneshot::Receiver<MaintenanceResult>,
}

impl MaintenanceTicket {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn op(&self) -> MaintenanceOp {
        self.op
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> MaintenanceResult {
        self.rx.await.unwrap_or_else(|_| {
            MaintenanceResult::Failed("Maintenance worker stopped before completion".into())
        })
    }
}

/// Admits at most one maintenance operation at a time.
pub struct UpdateOrchestrator {
    ongoing: Arc<AtomicBool>,
    worker: WorkerHandle,
    response_timeout: Duration,
}

impl UpdateOrchestrator {
    /// Create an orchestrator in front of a started worker.
    pub fn new(worker: WorkerHandle, response_timeout: Duration) -> Self {
        Self {
            ongoing: Arc::new(AtomicBool::new(false)),
            worker,
            response_timeout,
        }
    }

    /// Whether a maintenance operation is in flight.
    pub fn is_update_ongoing(&self) -> bool {
        self.ongoing.load(Ordering::Acquire)
    }

    /// Claim the update flag. Returns `None` when it is already held.
    pub fn try_begin(&self) -> Option<UpdateGuard> {
        self.ongoing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UpdateGuard {
                flag: self.ongoing.clone(),
            })
    }

    /// Admit `op` and hand it to the worker without waiting for it.
    pub fn submit(&self, op: MaintenanceOp) -> Result<MaintenanceTicket> {
        let Some(guard) = self.try_begin() else {
            warn!(op = op.name(), "Update already ongoing, rejecting request");
            return Err(Error::UpdateOngoing);
        };

        let ctx = MaintenanceContext::new(op);
        let run_id = ctx.run_id;
        let (reply, rx) = oneshot::channel();

        // On failure the request, and with it the guard, is dropped.
        self.worker.submit(MaintenanceRequest { ctx, reply, guard })?;

        info!(%run_id, op = op.name(), "Maintenance scheduled");
        Ok(MaintenanceTicket { run_id, op, rx })
    }

    /// Admit `op` and wait up to the response timeout for its outcome.
    pub async fn run_update(&self, op: MaintenanceOp) -> Result<UpdateResponse> {
        let ticket = match self.submit(op) {
            Ok(ticket) => ticket,
            Err(Error::UpdateOngoing) => return Ok(UpdateResponse::Conflict),
            Err(e) => return Err(e),
        };
        let run_id = ticket.run_id();

        match tokio::time::timeout(self.response_timeout, ticket.wait()).await {
            Ok(MaintenanceResult::Success(data)) => Ok(UpdateResponse::Completed(data)),
            Ok(MaintenanceResult::Failed(message)) => Ok(UpdateResponse::Failed(message)),
            Err(_) => {
                info!(%run_id, op = op.name(), "Maintenance still running, responding accepted");
                Ok(UpdateResponse::Accepted { run_id })
            }
        }
    }

    /// Subscribe to worker events.
    pub fn events(&self) -> broadcast::Receiver<MaintenanceEvent> {
        self.worker.events()
    }

    /// Stop the worker after the current run.
    pub async fn shutdown(&self) -> Result<()> {
        self.worker.shutdown().await
    }
}
