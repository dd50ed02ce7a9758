//! Per-device bounded admission

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting admission primitive limiting simultaneous executions on a device
///
/// Capacity is fixed at construction; replacing the device record in the
/// registry is the resize path. Waiters are served in FIFO order.
#[derive(Debug)]
pub struct ConcurrencyGate {
    capacity: u32,
    slots: Arc<Semaphore>,
}

impl ConcurrencyGate {
    /// Create a gate with the given capacity, clamped to at least one slot
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity as usize)),
        }
    }

    /// Wait for a free slot
    ///
    /// The returned permit gives the slot back when dropped, so the
    /// available count never exceeds the original capacity.
    pub async fn acquire(&self) -> GatePermit {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore is never closed");
        GatePermit { _permit: permit }
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Capacity the gate was created with
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// RAII slot handle returned by [`ConcurrencyGate::acquire`]
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}
