//! Device discovery probes

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::device::{Device, DeviceVendor};
use crate::error::{AccelqError, AccelqResult};

/// Discovers accelerator devices
///
/// Discovery is advisory: a probe that finds nothing is not an error for
/// the registry. An empty registry is valid, and selecting against it is
/// the only failure surface.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    /// Probe available devices
    async fn probe(&self) -> AccelqResult<Vec<Device>>;

    /// Probe name for diagnostics
    fn name(&self) -> &'static str;
}

/// Probe backed by NVIDIA NVML
///
/// Discovered devices come back enabled, with free memory populated from
/// the driver and the given admission/budget defaults applied.
#[derive(Debug, Clone)]
pub struct NvmlProbe {
    /// Admission slots assigned to each discovered device
    pub max_concurrency: u32,
    /// Budget ceiling assigned to each discovered device; `None` means unlimited
    pub budget_limit: Option<u64>,
}

impl Default for NvmlProbe {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            budget_limit: None,
        }
    }
}

#[async_trait]
impl DeviceProbe for NvmlProbe {
    async fn probe(&self) -> AccelqResult<Vec<Device>> {
        let nvml = nvml_wrapper::Nvml::init()
            .map_err(|e| AccelqError::Probe(format!("NVML init failed: {}", e)))?;
        let count = nvml
            .device_count()
            .map_err(|e| AccelqError::Probe(format!("NVML device count failed: {}", e)))?;

        let mut devices = Vec::with_capacity(count as usize);
        for index in 0..count {
            let handle = nvml
                .device_by_index(index)
                .map_err(|e| AccelqError::Probe(format!("NVML device {} failed: {}", index, e)))?;
            let name = handle.name().unwrap_or_else(|_| format!("GPU {}", index));
            let memory = handle
                .memory_info()
                .map_err(|e| AccelqError::Probe(format!("NVML memory info failed: {}", e)))?;

            devices.push(Device {
                id: index,
                name,
                vendor: DeviceVendor::Nvidia,
                total_bytes: memory.total,
                free_bytes: Some(memory.free),
                enabled: true,
                max_concurrency: self.max_concurrency,
                budget_limit: self.budget_limit,
            });
        }

        debug!(count = devices.len(), "NVML probe finished");
        Ok(devices)
    }

    fn name(&self) -> &'static str {
        "nvml"
    }
}

/// Probe returning a fixed device list
///
/// Used by tests and simulated runs.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    devices: Vec<Device>,
}

impl StaticProbe {
    /// Create a probe over the given devices
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl DeviceProbe for StaticProbe {
    async fn probe(&self) -> AccelqResult<Vec<Device>> {
        Ok(self.devices.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Run a probe, treating failure as an empty inventory
pub async fn probe_or_empty(probe: &dyn DeviceProbe) -> Vec<Device> {
    match probe.probe().await {
        Ok(devices) => devices,
        Err(e) => {
            warn!(probe = probe.name(), error = %e, "Device probe failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProbe;

    #[async_trait]
    impl DeviceProbe for FailingProbe {
        async fn probe(&self) -> AccelqResult<Vec<Device>> {
            Err(AccelqError::Probe("vendor tool missing".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_static_probe_returns_devices() {
        let probe = StaticProbe::new(vec![Device::new(0, "gpu-0", 1024)]);
        let devices = probe.probe().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, 0);
    }

    #[tokio::test]
    async fn test_probe_or_empty_swallows_failure() {
        let devices = probe_or_empty(&FailingProbe).await;
        assert!(devices.is_empty());
    }

    #[tokio::test]
    async fn test_probe_error_carries_cause() {
        let err = FailingProbe.probe().await.unwrap_err();
        assert_eq!(err.to_string(), "device probe failed: vendor tool missing");
    }
}
