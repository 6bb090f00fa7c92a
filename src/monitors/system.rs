//! SystemSampler - host CPU, memory and disk utilization
//!
//! Each metric is read on its own. A source that cannot be read is reported
//! as `0` and listed in [`SystemMetrics::unavailable`]; the remaining metrics
//! are still sampled.

use std::path::{Path, PathBuf};

use sysinfo::{Disks, System};
use tracing::{instrument, trace, warn};

use crate::{SystemMetric, SystemMetrics};

pub struct SystemSampler {
    system: System,
    disk_path: PathBuf,
}

impl SystemSampler {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            system: System::new(),
            disk_path: disk_path.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn sample(&mut self) -> SystemMetrics {
        let mut metrics = SystemMetrics::default();

        match self.cpu_percent().await {
            Some(cpu) => metrics.cpu_percent = cpu,
            None => {
                warn!("CPU usage unavailable, reporting 0");
                metrics.unavailable.push(SystemMetric::Cpu);
            }
        }

        match self.memory_percent() {
            Some(memory) => metrics.memory_percent = memory,
            None => {
                warn!("memory usage unavailable, reporting 0");
                metrics.unavailable.push(SystemMetric::Memory);
            }
        }

        match self.disk_percent() {
            Some(disk) => metrics.disk_percent = disk,
            None => {
                warn!(
                    "disk usage for {} unavailable, reporting 0",
                    self.disk_path.display()
                );
                metrics.unavailable.push(SystemMetric::Disk);
            }
        }

        trace!(
            "sampled cpu={:.1}% memory={:.1}% disk={:.1}%",
            metrics.cpu_percent, metrics.memory_percent, metrics.disk_percent
        );

        metrics
    }

    async fn cpu_percent(&mut self) -> Option<f32> {
        // usage is computed from the difference between two refreshes
        self.system.refresh_cpu_usage();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_cpu_usage();

        if self.system.cpus().is_empty() {
            return None;
        }

        let usage = self.system.global_cpu_usage();
        usage.is_finite().then(|| clamp_percent(usage))
    }

    fn memory_percent(&mut self) -> Option<f32> {
        self.system.refresh_memory();
        usage_percent(self.system.used_memory(), self.system.total_memory())
    }

    fn disk_percent(&self) -> Option<f32> {
        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<DiskUsage> = disks
            .iter()
            .map(|disk| DiskUsage {
                mount_point: disk.mount_point().to_path_buf(),
                total: disk.total_space(),
                available: disk.available_space(),
            })
            .collect();

        let disk = disk_for_path(&mounts, &self.disk_path)?;
        usage_percent(disk.total.saturating_sub(disk.available), disk.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total: u64,
    pub available: u64,
}

/// Pick the mount that holds `path`: the longest mount point that is a prefix of it.
pub fn disk_for_path<'a>(disks: &'a [DiskUsage], path: &Path) -> Option<&'a DiskUsage> {
    disks
        .iter()
        .filter(|disk| path.starts_with(&disk.mount_point))
        .max_by_key(|disk| disk.mount_point.as_os_str().len())
}

/// `used / total` in percent, or `None` when there is nothing to measure.
pub fn usage_percent(used: u64, total: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    Some(clamp_percent((used as f64 / total as f64 * 100.0) as f32))
}

fn clamp_percent(value: f32) -> f32 {
    value.clamp(0.0, 100.0)
}
