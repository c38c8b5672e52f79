//! System health monitoring.
//!
//! Gathers hardware/OS specs and samples CPU, memory, and disk usage over
//! a duration; the samples plus recent filtered journal lines form the
//! payload for the health-diagnosis prompt. Ctrl-C during sampling keeps
//! the data collected so far instead of discarding the run.

use anyhow::{bail, Result};
use serde::Serialize;
use std::time::{Duration, Instant};
use sysinfo::{Disks, System};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Static machine description sent along with the metric samples.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSpecs {
    pub os: String,
    pub os_release: String,
    pub kernel: String,
    pub cpu_count: usize,
    pub cpu_freq_mhz: u64,
    pub memory_total_gb: f64,
    pub disk_total_gb: f64,
    pub disk_free_gb: f64,
}

/// One point-in-time measurement.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
    pub elapsed_secs: u64,
    pub cpu_percent: f32,
    pub memory_used_gb: f64,
    pub memory_percent: f64,
}

/// The full sampling run.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorMetrics {
    pub duration_secs: u64,
    pub interval_secs: u64,
    pub interrupted: bool,
    pub samples: Vec<MetricSample>,
}

/// Collect the machine description.
pub fn system_specs() -> SystemSpecs {
    let mut sys = System::new_all();
    sys.refresh_all();

    let disks = Disks::new_with_refreshed_list();
    let disk_total: u64 = disks.iter().map(|d| d.total_space()).sum();
    let disk_free: u64 = disks.iter().map(|d| d.available_space()).sum();

    SystemSpecs {
        os: System::name().unwrap_or_else(|| "Unknown".to_string()),
        os_release: System::os_version().unwrap_or_default(),
        kernel: System::kernel_version().unwrap_or_default(),
        cpu_count: sys.cpus().len(),
        cpu_freq_mhz: sys.cpus().first().map(|c| c.frequency()).unwrap_or(0),
        memory_total_gb: round1(sys.total_memory() as f64 / BYTES_PER_GB),
        disk_total_gb: round1(disk_total as f64 / BYTES_PER_GB),
        disk_free_gb: round1(disk_free as f64 / BYTES_PER_GB),
    }
}

/// Sample metrics every `interval_secs` until `duration_secs` has elapsed
/// or the user interrupts. Partial results are kept either way.
pub async fn sample_metrics(duration_secs: u64, interval_secs: u64) -> MonitorMetrics {
    let duration = Duration::from_secs(duration_secs);
    let interval = Duration::from_secs(interval_secs);
    let started = Instant::now();

    let mut sys = System::new();
    sys.refresh_cpu();
    sys.refresh_memory();

    let mut samples = Vec::new();
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                samples.push(sample_from(&sys, started.elapsed()));
            }
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                break;
            }
        }
        if started.elapsed() >= duration {
            break;
        }
    }

    MonitorMetrics {
        duration_secs,
        interval_secs,
        interrupted,
        samples,
    }
}

fn sample_from(sys: &System, elapsed: Duration) -> MetricSample {
    let total = sys.total_memory() as f64;
    let used = sys.used_memory() as f64;
    MetricSample {
        elapsed_secs: elapsed.as_secs(),
        cpu_percent: sys.global_cpu_info().cpu_usage(),
        memory_used_gb: round1(used / BYTES_PER_GB),
        memory_percent: if total > 0.0 {
            round1(used / total * 100.0)
        } else {
            0.0
        },
    }
}

/// The JSON document handed to the health-diagnosis prompt.
pub fn health_payload(
    specs: &SystemSpecs,
    metrics: &MonitorMetrics,
    recent_logs: &str,
) -> serde_json::Value {
    serde_json::json!({
        "system_specs": specs,
        "performance_metrics": metrics,
        "recent_logs": recent_logs,
    })
}

/// Parse a duration like `90`, `30s`, `5m`, `1h`, or `2d` into seconds.
pub fn parse_duration(input: &str) -> Result<u64> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        bail!("empty duration");
    }

    let (value, multiplier) = match input.as_bytes()[input.len() - 1] {
        b's' => (&input[..input.len() - 1], 1),
        b'm' => (&input[..input.len() - 1], 60),
        b'h' => (&input[..input.len() - 1], 3600),
        b'd' => (&input[..input.len() - 1], 86400),
        _ => (input.as_str(), 1),
    };

    match value.parse::<u64>() {
        Ok(n) => Ok(n * multiplier),
        Err(_) => bail!("invalid duration format: {input}"),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
