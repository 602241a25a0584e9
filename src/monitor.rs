//! Best-effort system metric sampling.
//!
//! [`SystemSampler`] captures point-in-time [`SystemSample`]s of CPU load,
//! memory use, SoC temperature, and throttling state. Every field is
//! independent: a metric that cannot be read (missing sensor, missing
//! `vcgencmd`, non-Linux host) is recorded as absent, never as an error,
//! so sampling keeps working on whatever subset the platform provides.
//!
//! # Sources
//!
//! | Metric | Primary | Fallback |
//! |--------|---------|----------|
//! | CPU % | `/proc/stat` aggregate delta | — |
//! | Memory % | `/proc/meminfo` | — |
//! | Temperature | `vcgencmd measure_temp` | `/sys/class/thermal/thermal_zone0/temp` |
//! | Throttled | `vcgencmd get_throttled` | — |
//!
//! External commands run with a timeout; a stalled read records absence for
//! that field only and never blocks the sampling cadence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Timeout for each external metric command. Two commands run per sample
/// (temperature and throttling), so the worst-case stall stays within the
/// default 1 s sampling cadence.
const COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

/// Sysfs thermal zone read when `vcgencmd` is unavailable.
const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// A point-in-time snapshot of system metrics. Immutable once captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSample {
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Aggregate CPU utilization since the previous sample, 0–100.
    pub cpu_percent: Option<f32>,
    /// Used physical memory as a percentage of total.
    pub memory_percent: Option<f32>,
    /// SoC temperature in degrees Celsius.
    pub temperature_celsius: Option<f32>,
    /// Whether the firmware reports active throttling or under-voltage.
    pub throttled: Option<bool>,
}

/// Aggregate CPU times parsed from the `/proc/stat` `cpu` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

/// Captures [`SystemSample`]s on demand.
///
/// Stateful: CPU utilization is derived from the delta between consecutive
/// `/proc/stat` reads, so the first sample reports CPU as absent.
#[derive(Debug, Default)]
pub struct SystemSampler {
    last_cpu: Option<CpuTimes>,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture one sample. Infallible: unreadable metrics are absent.
    pub fn sample(&mut self) -> SystemSample {
        SystemSample {
            timestamp: Utc::now(),
            cpu_percent: self.read_cpu_percent(),
            memory_percent: read_memory_percent(),
            temperature_celsius: read_temperature(),
            throttled: read_throttled(),
        }
    }

    fn read_cpu_percent(&mut self) -> Option<f32> {
        let content = std::fs::read_to_string("/proc/stat").ok()?;
        let current = parse_proc_stat(&content)?;
        let previous = self.last_cpu.replace(current);
        cpu_percent_between(previous?, current)
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat` into busy/total jiffies.
///
/// Busy excludes `idle` and `iowait` (fields 4 and 5).
fn parse_proc_stat(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|l| {
        l.starts_with("cpu") && l.as_bytes().get(3).copied() == Some(b' ')
    })?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse::<u64>().ok())
        .collect();
    if fields.len() < 5 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields[4];
    Some(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

/// Utilization between two `/proc/stat` readings, 0–100.
fn cpu_percent_between(previous: CpuTimes, current: CpuTimes) -> Option<f32> {
    let total_delta = current.total.checked_sub(previous.total)?;
    if total_delta == 0 {
        return None;
    }
    let busy_delta = current.busy.saturating_sub(previous.busy);
    Some((busy_delta as f32 / total_delta as f32 * 100.0).clamp(0.0, 100.0))
}

fn read_memory_percent() -> Option<f32> {
    let content = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_percent(&content)
}

/// Used-memory percentage from `/proc/meminfo` (`MemTotal` − `MemAvailable`).
fn parse_meminfo_percent(content: &str) -> Option<f32> {
    let mut total_kb = None;
    let mut available_kb = None;
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = first_u64(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kb = first_u64(rest);
        }
    }
    let total = total_kb?;
    let available = available_kb?;
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(available);
    Some((used as f32 / total as f32 * 100.0).clamp(0.0, 100.0))
}

fn first_u64(s: &str) -> Option<u64> {
    s.split_whitespace().next()?.parse::<u64>().ok()
}

fn read_temperature() -> Option<f32> {
    if let Some(out) = run_command_with_timeout("vcgencmd", &["measure_temp"], COMMAND_TIMEOUT)
        && let Some(temp) = parse_vcgencmd_temp(&out)
    {
        return Some(temp);
    }
    // Fallback to the generic thermal zone (millidegrees).
    let raw = std::fs::read_to_string(THERMAL_ZONE_PATH).ok()?;
    raw.trim().parse::<f32>().ok().map(|milli| milli / 1000.0)
}

/// Parse `vcgencmd measure_temp` output, e.g. `temp=42.8'C`.
fn parse_vcgencmd_temp(output: &str) -> Option<f32> {
    let rest = output.trim().strip_prefix("temp=")?;
    let digits = rest.split('\'').next()?;
    digits.parse::<f32>().ok()
}

fn read_throttled() -> Option<bool> {
    let out = run_command_with_timeout("vcgencmd", &["get_throttled"], COMMAND_TIMEOUT)?;
    parse_throttled(&out).map(|flags| flags.is_throttled())
}

/// Decoded `vcgencmd get_throttled` bits.
///
/// Only the "now" bits matter for sampling; the sticky occurred-since-boot
/// bits (0x10000..) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleFlags {
    pub under_voltage: bool,
    pub freq_capped: bool,
    pub throttled: bool,
    pub soft_temp_limit: bool,
}

impl ThrottleFlags {
    /// The condition the benchmark records: actively throttled or starved
    /// of voltage. Frequency capping alone does not count.
    pub fn is_throttled(self) -> bool {
        self.throttled || self.under_voltage
    }
}

/// Parse `vcgencmd get_throttled` output, e.g. `throttled=0x50005`.
fn parse_throttled(output: &str) -> Option<ThrottleFlags> {
    let value = output.trim().strip_prefix("throttled=")?;
    let hex = value.strip_prefix("0x").unwrap_or(value);
    let bits = u32::from_str_radix(hex, 16).ok()?;
    Some(ThrottleFlags {
        under_voltage: bits & 0x1 != 0,
        freq_capped: bits & 0x2 != 0,
        throttled: bits & 0x4 != 0,
        soft_temp_limit: bits & 0x8 != 0,
    })
}

/// Run a command and return trimmed stdout, or `None` on failure, non-zero
/// exit, empty output, or timeout.
///
/// The command runs on a helper thread; if it stalls past `timeout` the
/// thread is abandoned and the field is recorded as absent.
fn run_command_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let command = program.to_owned();
    let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    let (tx, rx) = std::sync::mpsc::channel::<Option<String>>();

    std::thread::spawn(move || {
        let result = std::process::Command::new(&command)
            .args(&args)
            .output()
            .ok()
            .filter(|out| out.status.success())
            .and_then(|out| String::from_utf8(out.stdout).ok())
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => {
            debug!(program, "metric command timed out");
            None
        }
    }
}
