//! Device records, selection policies, and work item descriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Represents one schedulable accelerator device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Registry key, unique within a registry
    pub id: u32,
    /// Display label with no semantic weight
    pub name: String,
    /// Device vendor
    pub vendor: DeviceVendor,
    /// Total addressable memory in bytes
    pub total_bytes: u64,
    /// Currently free memory in bytes, unknown until probed
    pub free_bytes: Option<u64>,
    /// Disabled devices are skipped by selection but stay retrievable by id
    pub enabled: bool,
    /// Maximum simultaneous executions admitted on this device
    pub max_concurrency: u32,
    /// Ceiling for memory reservations; `None` means unlimited
    pub budget_limit: Option<u64>,
}

impl Device {
    /// Create an enabled device with a single admission slot and no budget ceiling
    pub fn new(id: u32, name: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            id,
            name: name.into(),
            vendor: DeviceVendor::Unknown,
            total_bytes,
            free_bytes: None,
            enabled: true,
            max_concurrency: 1,
            budget_limit: None,
        }
    }
}

/// Device vendor types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Unknown,
}

impl std::fmt::Display for DeviceVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceVendor::Nvidia => write!(f, "NVIDIA"),
            DeviceVendor::Amd => write!(f, "AMD"),
            DeviceVendor::Intel => write!(f, "Intel"),
            DeviceVendor::Apple => write!(f, "Apple"),
            DeviceVendor::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Rule used to pick a device for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Rotate through enabled devices in id order
    RoundRobin,
    /// Enabled device with the most known free memory
    MostFreeVram,
    /// Exactly the device named by the work item
    SpecificDevice,
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPolicy::RoundRobin => write!(f, "round-robin"),
            SelectionPolicy::MostFreeVram => write!(f, "most-free-vram"),
            SelectionPolicy::SpecificDevice => write!(f, "specific-device"),
        }
    }
}

/// Caller-supplied description of one submission
///
/// Constructed per submission and consumed once; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Memory the job claims it needs; 0 means no reservation
    pub requested_bytes: u64,
    /// Device override, consulted only by [`SelectionPolicy::SpecificDevice`]
    pub device_id: Option<u32>,
    /// Opaque label carried through diagnostics
    pub tag: String,
    /// Admission deadline; the submission is cancelled when it elapses
    pub timeout: Option<Duration>,
    /// Declared but not consulted by any selection or admission logic
    pub priority: i32,
}

impl WorkItem {
    /// Create a work item with no resource claims
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            requested_bytes: 0,
            device_id: None,
            tag: tag.into(),
            timeout: None,
            priority: 0,
        }
    }
}

impl Default for WorkItem {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_new_defaults() {
        let device = Device::new(0, "gpu-0", 16 * 1024 * 1024 * 1024);
        assert_eq!(device.id, 0);
        assert!(device.enabled);
        assert_eq!(device.max_concurrency, 1);
        assert!(device.free_bytes.is_none());
        assert!(device.budget_limit.is_none());
    }

    #[test]
    fn test_work_item_new() {
        let item = WorkItem::new("warmup");
        assert_eq!(item.tag, "warmup");
        assert_eq!(item.requested_bytes, 0);
        assert!(item.device_id.is_none());
        assert!(item.timeout.is_none());
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(SelectionPolicy::RoundRobin.to_string(), "round-robin");
        assert_eq!(SelectionPolicy::MostFreeVram.to_string(), "most-free-vram");
        assert_eq!(
            SelectionPolicy::SpecificDevice.to_string(),
            "specific-device"
        );
    }

    #[test]
    fn test_vendor_display() {
        assert_eq!(DeviceVendor::Nvidia.to_string(), "NVIDIA");
        assert_eq!(DeviceVendor::Unknown.to_string(), "Unknown");
    }
}
