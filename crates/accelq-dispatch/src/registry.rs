//! Device inventory and selection policies

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use accelq_core::{AccelqError, AccelqResult, Device, MemoryBudget, SelectionPolicy};

use crate::gate::ConcurrencyGate;

/// One registered device with its resource ledgers
#[derive(Debug)]
struct DeviceEntry {
    device: Device,
    budget: Arc<MemoryBudget>,
    gate: Arc<ConcurrencyGate>,
}

/// Selection result: a device snapshot plus handles to its ledgers
///
/// The handles stay valid even if the record is replaced or removed after
/// selection; they simply stop being what the registry hands out next.
#[derive(Debug, Clone)]
pub struct DeviceLease {
    /// Snapshot of the selected device record
    pub device: Device,
    /// The device's memory budget
    pub budget: Arc<MemoryBudget>,
    /// The device's admission gate
    pub gate: Arc<ConcurrencyGate>,
}

/// Inventory of schedulable devices
///
/// Mutation and selection share one lock so add/remove/list and the
/// round-robin cursor stay serialized with respect to each other.
/// Selection never blocks on I/O.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Devices in ascending id order; iteration order is the selection order
    devices: BTreeMap<u32, DeviceEntry>,
    /// Round-robin cursor, shared across all round-robin selections
    rr_cursor: u64,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a device by id
    ///
    /// Replacing a record installs a fresh budget and a fresh gate sized
    /// from the new `max_concurrency`; permits already granted on the old
    /// gate stay valid until dropped.
    pub async fn add_or_replace(&self, device: Device) {
        let entry = DeviceEntry {
            budget: Arc::new(MemoryBudget::new(device.budget_limit)),
            gate: Arc::new(ConcurrencyGate::new(device.max_concurrency)),
            device,
        };
        let mut inner = self.inner.write().await;
        debug!(
            device_id = entry.device.id,
            name = %entry.device.name,
            max_concurrency = entry.device.max_concurrency,
            "Registered device"
        );
        inner.devices.insert(entry.device.id, entry);
    }

    /// Remove a device, returning whether it was present
    pub async fn remove(&self, id: u32) -> bool {
        let removed = self.inner.write().await.devices.remove(&id).is_some();
        if removed {
            debug!(device_id = id, "Removed device");
        }
        removed
    }

    /// Look up a device by id, including disabled ones
    pub async fn get(&self, id: u32) -> Option<Device> {
        self.inner
            .read()
            .await
            .devices
            .get(&id)
            .map(|entry| entry.device.clone())
    }

    /// Snapshot of all registered devices
    pub async fn list(&self) -> Vec<Device> {
        self.inner
            .read()
            .await
            .devices
            .values()
            .map(|entry| entry.device.clone())
            .collect()
    }

    /// Number of registered devices, including disabled ones
    pub async fn len(&self) -> usize {
        self.inner.read().await.devices.len()
    }

    /// Whether the registry holds no devices
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.devices.is_empty()
    }

    /// Pick a device for a submission
    ///
    /// Fails when no device is enabled, or when the policy is
    /// [`SelectionPolicy::SpecificDevice`] and `specific` is absent or not
    /// among the enabled devices.
    pub async fn select(
        &self,
        policy: SelectionPolicy,
        specific: Option<u32>,
    ) -> AccelqResult<DeviceLease> {
        let mut inner = self.inner.write().await;

        let enabled_ids: Vec<u32> = inner
            .devices
            .values()
            .filter(|entry| entry.device.enabled)
            .map(|entry| entry.device.id)
            .collect();
        if enabled_ids.is_empty() {
            return Err(AccelqError::Selection {
                requested_id: specific,
                enabled: 0,
            });
        }

        let chosen_id = match policy {
            SelectionPolicy::RoundRobin => {
                let index = (inner.rr_cursor % enabled_ids.len() as u64) as usize;
                inner.rr_cursor = inner.rr_cursor.wrapping_add(1);
                enabled_ids[index]
            }
            SelectionPolicy::MostFreeVram => {
                let mut best: Option<(u32, u64)> = None;
                for entry in inner.devices.values().filter(|e| e.device.enabled) {
                    if let Some(free) = entry.device.free_bytes {
                        if best.map_or(true, |(_, best_free)| free > best_free) {
                            best = Some((entry.device.id, free));
                        }
                    }
                }
                // No device has a known free value: fall back to the first
                best.map(|(id, _)| id).unwrap_or(enabled_ids[0])
            }
            SelectionPolicy::SpecificDevice => {
                let requested = specific.ok_or(AccelqError::Selection {
                    requested_id: None,
                    enabled: enabled_ids.len(),
                })?;
                if !enabled_ids.contains(&requested) {
                    return Err(AccelqError::Selection {
                        requested_id: Some(requested),
                        enabled: enabled_ids.len(),
                    });
                }
                requested
            }
        };

        let entry = inner
            .devices
            .get(&chosen_id)
            .expect("selected id comes from the map");

        debug!(
            policy = %policy,
            device_id = chosen_id,
            enabled = enabled_ids.len(),
            "Selected device"
        );

        Ok(DeviceLease {
            device: entry.device.clone(),
            budget: entry.budget.clone(),
            gate: entry.gate.clone(),
        })
    }
}
