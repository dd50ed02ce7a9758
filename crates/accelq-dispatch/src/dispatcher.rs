//! Submit-and-execute orchestration
//!
//! Composes device selection, budget reservation, and gate admission into
//! one contract: select, reserve, admit, execute, release. The release of
//! the gate slot and any reserved budget is tied to guard lifetimes so it
//! runs on every exit path exactly once.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use accelq_core::{AccelqError, AccelqResult, MemoryBudget, SelectionPolicy, WorkItem};

use crate::gate::GatePermit;
use crate::registry::{DeviceLease, DeviceRegistry};

/// Budget reservation that rolls itself back when dropped
struct Reservation {
    budget: Arc<MemoryBudget>,
    bytes: u64,
}

impl Reservation {
    /// Reserve the work item's bytes on the leased device
    ///
    /// A zero-byte request reserves nothing and needs no rollback.
    fn reserve(lease: &DeviceLease, bytes: u64) -> AccelqResult<Option<Self>> {
        if bytes == 0 {
            return Ok(None);
        }
        if !lease.budget.try_reserve(bytes) {
            return Err(AccelqError::BudgetExceeded {
                device_id: lease.device.id,
                requested: bytes,
                available: lease.budget.available().unwrap_or(0),
            });
        }
        Ok(Some(Self {
            budget: lease.budget.clone(),
            bytes,
        }))
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.budget.release(self.bytes);
    }
}

/// Top-level entry point for running work on accelerator devices
pub struct Dispatcher {
    registry: Arc<DeviceRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over the given registry
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher selects from
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Submit a job and wait for its result
    ///
    /// The job runs exactly once if admitted, parameterized by the id of
    /// the selected device. Selection and budget denial fail fast with
    /// nothing to unwind; cancellation while waiting on the gate rolls the
    /// reservation back before surfacing. Errors the job raises flow
    /// through the release path: recognized kinds pass through untouched,
    /// anything else is wrapped once with its cause preserved.
    ///
    /// Cancellation after the job has started is the job's own concern;
    /// the release path runs regardless of how the job ends.
    pub async fn submit<T, F, Fut>(
        &self,
        policy: SelectionPolicy,
        work: WorkItem,
        cancel: CancellationToken,
        job: F,
    ) -> AccelqResult<T>
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let submission_id = Uuid::new_v4();
        let lease = self.registry.select(policy, work.device_id).await?;
        let device_id = lease.device.id;

        let _reservation = Reservation::reserve(&lease, work.requested_bytes)?;
        debug!(
            submission_id = %submission_id,
            tag = %work.tag,
            device_id,
            requested_bytes = work.requested_bytes,
            "Submission admitted to device"
        );

        let _permit = admit(&lease, &work, &cancel).await?;

        match job(device_id).await {
            Ok(value) => {
                debug!(submission_id = %submission_id, device_id, "Job finished");
                Ok(value)
            }
            Err(err) => {
                warn!(submission_id = %submission_id, device_id, error = %err, "Job failed");
                Err(match err.downcast::<AccelqError>() {
                    Ok(known) => known,
                    Err(other) => AccelqError::Job(other),
                })
            }
        }
    }

    /// Submit a synchronous job
    ///
    /// Routed through [`Self::submit`]; the computation is awaited within
    /// the same execution step.
    pub async fn submit_sync<T, F>(
        &self,
        policy: SelectionPolicy,
        work: WorkItem,
        cancel: CancellationToken,
        job: F,
    ) -> AccelqResult<T>
    where
        F: FnOnce(u32) -> anyhow::Result<T>,
    {
        self.submit(policy, work, cancel, move |device_id| async move {
            job(device_id)
        })
        .await
    }
}

/// Wait for a gate slot under the caller's scope and the item's timeout,
/// whichever cancels first
async fn admit(
    lease: &DeviceLease,
    work: &WorkItem,
    cancel: &CancellationToken,
) -> AccelqResult<GatePermit> {
    match work.timeout {
        Some(deadline) => tokio::select! {
            _ = cancel.cancelled() => Err(AccelqError::Cancelled),
            admitted = tokio::time::timeout(deadline, lease.gate.acquire()) => {
                admitted.map_err(|_| AccelqError::Cancelled)
            }
        },
        None => tokio::select! {
            _ = cancel.cancelled() => Err(AccelqError::Cancelled),
            permit = lease.gate.acquire() => Ok(permit),
        },
    }
}
