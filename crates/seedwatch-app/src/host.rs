//! Operating system backed [`HostProbe`].

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use seedwatch_torrent_core::{HostProbe, HostSample, ProbeError, ProbeResult};
use systemstat::{Platform, System};

/// Window over which aggregate CPU load is measured.
pub const DEFAULT_CPU_WINDOW: Duration = Duration::from_millis(500);

/// Reads CPU load, memory usage and uptime through `systemstat`.
#[derive(Debug, Clone, Copy)]
pub struct SystemHostProbe {
    cpu_window: Duration,
}

impl SystemHostProbe {
    /// Probe measuring CPU load over `cpu_window`.
    #[must_use]
    pub const fn new(cpu_window: Duration) -> Self {
        Self { cpu_window }
    }
}

impl Default for SystemHostProbe {
    fn default() -> Self {
        Self::new(DEFAULT_CPU_WINDOW)
    }
}

#[async_trait]
impl HostProbe for SystemHostProbe {
    async fn sample(&self) -> ProbeResult<HostSample> {
        let window = self.cpu_window;
        tokio::task::spawn_blocking(move || read_sample(window))
            .await
            .map_err(|err| ProbeError {
                operation: "sample.join",
                source: io::Error::other(err),
            })?
    }
}

fn read_sample(cpu_window: Duration) -> ProbeResult<HostSample> {
    let system = System::new();
    let load = system
        .cpu_load_aggregate()
        .map_err(|source| probe_error("cpu_load", source))?;
    std::thread::sleep(cpu_window);
    let load = load
        .done()
        .map_err(|source| probe_error("cpu_load", source))?;
    let memory = system
        .memory()
        .map_err(|source| probe_error("memory", source))?;
    let uptime = system
        .uptime()
        .map_err(|source| probe_error("uptime", source))?;

    Ok(HostSample {
        cpu_percent: busy_percent(load.idle),
        ram_percent: used_percent(memory.total.as_u64(), memory.free.as_u64()),
        uptime,
    })
}

/// Idle fraction over the window turned into a busy percentage; no ticks elapsed reads as 0.
fn busy_percent(idle: f32) -> f32 {
    if idle.is_finite() {
        ((1.0 - idle) * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn used_percent(total: u64, free: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(free);
    (used as f64 / total as f64 * 100.0) as f32
}

const fn probe_error(operation: &'static str, source: io::Error) -> ProbeError {
    ProbeError { operation, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_percent_handles_edges() {
        assert!((used_percent(1_000, 250) - 75.0).abs() < f32::EPSILON);
        assert!(used_percent(0, 0).abs() < f32::EPSILON);
        assert!((used_percent(100, 500) - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn busy_percent_ignores_empty_windows() {
        assert!((busy_percent(0.25) - 75.0).abs() < f32::EPSILON);
        assert!(busy_percent(f32::NAN).abs() < f32::EPSILON);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn samples_are_within_bounds() -> anyhow::Result<()> {
        let sample = SystemHostProbe::new(Duration::from_millis(50)).sample().await?;
        assert!((0.0..=100.0).contains(&sample.cpu_percent));
        assert!((0.0..=100.0).contains(&sample.ram_percent));
        assert!(sample.uptime > Duration::ZERO);
        Ok(())
    }
}
