//! accelq demo driver
//!
//! Probes accelerator devices (simulating a small fleet when none are
//! found), registers them, and fans a batch of sample jobs through the
//! dispatcher.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use accelq_core::{
    probe_or_empty, AccelqConfig, Device, DeviceVendor, NvmlProbe, SelectionPolicy, WorkItem,
};
use accelq_dispatch::{DeviceRegistry, Dispatcher};

/// accelq - device-aware work dispatcher for accelerator workloads
#[derive(Parser, Debug)]
#[command(name = "accelq")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device selection policy (round-robin, most-free-vram, specific)
    #[arg(long)]
    policy: Option<String>,

    /// Device id for the specific policy
    #[arg(long)]
    device: Option<u32>,

    /// Number of sample jobs to submit
    #[arg(long, default_value_t = 8)]
    jobs: u32,

    /// Bytes each job reserves against its device budget
    #[arg(long, default_value_t = 0)]
    bytes: u64,

    /// How long each sample job runs, in milliseconds
    #[arg(long, default_value_t = 200)]
    job_millis: u64,

    /// Admission deadline per job, in milliseconds
    #[arg(long)]
    timeout_millis: Option<u64>,

    /// Admission slots per device
    #[arg(long)]
    max_concurrency: Option<u32>,

    /// Budget ceiling per device in bytes
    #[arg(long)]
    budget_limit: Option<u64>,

    /// Devices to simulate when probing finds nothing
    #[arg(long, default_value_t = 2)]
    simulate: u32,

    /// Print the device inventory as JSON before running
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_policy(name: &str) -> Result<SelectionPolicy> {
    Ok(match name.to_lowercase().as_str() {
        "round-robin" | "roundrobin" => SelectionPolicy::RoundRobin,
        "most-free-vram" | "most-free" => SelectionPolicy::MostFreeVram,
        "specific" | "specific-device" => SelectionPolicy::SpecificDevice,
        other => bail!("unknown policy: {}", other),
    })
}

fn simulated_devices(count: u32, max_concurrency: u32, budget_limit: Option<u64>) -> Vec<Device> {
    (0..count)
        .map(|i| Device {
            id: i,
            name: format!("sim-{}", i),
            vendor: DeviceVendor::Unknown,
            total_bytes: 8 * 1024 * 1024 * 1024,
            // Stagger free memory so the most-free policy has something to chew on
            free_bytes: Some((u64::from(i) + 1) * 1024 * 1024 * 1024),
            enabled: true,
            max_concurrency,
            budget_limit,
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AccelqConfig::from_file(path)?,
        None => AccelqConfig::default(),
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.logging.level)
        .to_lowercase();
    let log_level = match log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    info!("Starting accelq demo v{}", env!("CARGO_PKG_VERSION"));

    let policy = match args.policy.as_deref() {
        Some(name) => parse_policy(name)?,
        None => config.dispatch.policy,
    };
    let max_concurrency = args
        .max_concurrency
        .unwrap_or(config.dispatch.default_max_concurrency);
    let budget_limit = args.budget_limit.or(config.dispatch.default_budget_limit);

    let mut devices = if config.probe.enabled {
        let probe = NvmlProbe {
            max_concurrency,
            budget_limit,
        };
        probe_or_empty(&probe).await
    } else {
        Vec::new()
    };
    if devices.is_empty() {
        warn!(count = args.simulate, "No hardware devices found, simulating");
        devices = simulated_devices(args.simulate, max_concurrency, budget_limit);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    }

    let registry = Arc::new(DeviceRegistry::new());
    for device in devices {
        registry.add_or_replace(device).await;
    }
    let device_count = registry.len().await;
    info!(devices = device_count, policy = %policy, "Registry ready");

    let dispatcher = Arc::new(Dispatcher::new(registry));
    let cancel = CancellationToken::new();

    let mut handles = Vec::new();
    for n in 0..args.jobs {
        let dispatcher = dispatcher.clone();
        let cancel = cancel.clone();
        let job_millis = args.job_millis;
        let work = WorkItem {
            requested_bytes: args.bytes,
            device_id: args.device,
            tag: format!("job-{}", n),
            timeout: args.timeout_millis.map(Duration::from_millis),
            priority: 0,
        };
        handles.push(tokio::spawn(async move {
            dispatcher
                .submit(policy, work, cancel, |device_id| async move {
                    tokio::time::sleep(Duration::from_millis(job_millis)).await;
                    Ok(device_id)
                })
                .await
        }));
    }

    let mut failed = 0u32;
    for (n, handle) in handles.into_iter().enumerate() {
        match handle.await? {
            Ok(device_id) => info!(job = n, device_id, "Job completed"),
            Err(e) => {
                failed += 1;
                warn!(job = n, error = %e, "Job failed");
            }
        }
    }

    info!(jobs = args.jobs, failed, "Demo run finished");
    Ok(())
}
