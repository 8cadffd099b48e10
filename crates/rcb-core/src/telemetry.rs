//! Host telemetry: CPU, RAM, root disk, CPU temperature and network totals.
//!
//! Sampling (`sample`) and rendering (`render_status`) are split so the report
//! text is a pure function of a snapshot and a timestamp.

use sysinfo::{Components, Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};

pub const BAR_CELLS: usize = 15;
pub const NOT_APPLICABLE: &str = "[ N/A ]";

const FILLED: char = '█';
const EMPTY: char = '░';
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = BYTES_PER_MB * 1024.0;

/// Chip names probed for the CPU temperature, highest priority first.
pub const DEFAULT_SENSOR_PRIORITY: [&str; 6] = [
    "coretemp",
    "k10temp",
    "zenpower",
    "cpu_thermal",
    "soc_thermal",
    "acpitz",
];

/// Render `value` out of `max` as a fixed-width bar with a percentage label.
///
/// `filled = floor(cells * value / max)`, capped at `cells`. Negative or
/// non-finite values, and a non-positive `max`, render `NOT_APPLICABLE`.
pub fn render_bar(value: f64, max: f64, cells: usize) -> String {
    if !value.is_finite() || value < 0.0 || !max.is_finite() || max <= 0.0 {
        return NOT_APPLICABLE.to_string();
    }

    let ratio = value / max;
    let filled = ((cells as f64 * ratio).floor() as usize).min(cells);
    let mut bar = String::with_capacity(cells * 3 + 12);
    bar.push('[');
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(cells - filled));
    bar.push(']');
    bar.push_str(&format!(" {:.1}%", ratio * 100.0));
    bar
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Temperature {
    Celsius(f32),
    Unavailable,
}

/// Best-effort CPU temperature probe.
pub trait TemperatureSource: Send + Sync {
    fn cpu_temperature(&self) -> Temperature;
}

/// Reads hwmon/thermal sensors through sysinfo.
#[derive(Clone, Debug)]
pub struct SensorTemperature {
    priority: Vec<String>,
}

impl SensorTemperature {
    pub fn new(priority: Vec<String>) -> Self {
        Self { priority }
    }
}

impl Default for SensorTemperature {
    fn default() -> Self {
        Self::new(DEFAULT_SENSOR_PRIORITY.iter().map(|s| s.to_string()).collect())
    }
}

impl TemperatureSource for SensorTemperature {
    fn cpu_temperature(&self) -> Temperature {
        let components = Components::new_with_refreshed_list();
        let readings: Vec<(String, f32)> = components
            .list()
            .iter()
            .map(|c| (c.label().to_string(), c.temperature()))
            .collect();
        pick_temperature(&readings, &self.priority)
    }
}

/// Choose a reading: first chip in `priority` order whose label contains the chip
/// name, otherwise the first sensor with a usable value.
pub fn pick_temperature(readings: &[(String, f32)], priority: &[String]) -> Temperature {
    let usable = |t: f32| t.is_finite() && t > -273.0;

    for chip in priority {
        let chip = chip.to_lowercase();
        let hit = readings
            .iter()
            .find(|(label, t)| usable(*t) && label.to_lowercase().contains(&chip));
        if let Some((_, t)) = hit {
            return Temperature::Celsius(*t);
        }
    }

    readings
        .iter()
        .find(|(_, t)| usable(*t))
        .map(|(_, t)| Temperature::Celsius(*t))
        .unwrap_or(Temperature::Unavailable)
}

#[derive(Clone, Debug, PartialEq)]
pub struct TelemetrySnapshot {
    pub cpu_percent: f64,
    pub ram_used: u64,
    pub ram_total: u64,
    /// `None` when no filesystem is mounted at `/`.
    pub disk: Option<DiskUsage>,
    pub temperature: Temperature,
    pub net_sent: u64,
    pub net_recv: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiskUsage {
    pub used: u64,
    pub total: u64,
}

/// Sample the host. Takes at least `MINIMUM_CPU_UPDATE_INTERVAL` for the CPU delta.
pub async fn sample(temperature: &dyn TemperatureSource) -> TelemetrySnapshot {
    let mut sys = System::new();
    sys.refresh_cpu();
    tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
    sys.refresh_cpu();
    sys.refresh_memory();

    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .map(|d| DiskUsage {
            used: d.total_space().saturating_sub(d.available_space()),
            total: d.total_space(),
        });

    let networks = Networks::new_with_refreshed_list();
    let (net_sent, net_recv) = networks.iter().fold((0u64, 0u64), |(tx, rx), (_, data)| {
        (
            tx.saturating_add(data.total_transmitted()),
            rx.saturating_add(data.total_received()),
        )
    });

    TelemetrySnapshot {
        cpu_percent: sys.global_cpu_info().cpu_usage() as f64,
        ram_used: sys.used_memory(),
        ram_total: sys.total_memory(),
        disk,
        temperature: temperature.cpu_temperature(),
        net_sent,
        net_recv,
    }
}

pub fn render_status(label: &str, snap: &TelemetrySnapshot, timestamp: &str) -> String {
    let ram = format!(
        "{}  {:.1}/{:.1} GB",
        render_bar(snap.ram_used as f64, snap.ram_total as f64, BAR_CELLS),
        snap.ram_used as f64 / BYTES_PER_GB,
        snap.ram_total as f64 / BYTES_PER_GB,
    );
    let disk = match snap.disk {
        Some(d) => format!(
            "{}  {:.1}/{:.1} GB",
            render_bar(d.used as f64, d.total as f64, BAR_CELLS),
            d.used as f64 / BYTES_PER_GB,
            d.total as f64 / BYTES_PER_GB,
        ),
        None => NOT_APPLICABLE.to_string(),
    };
    let temp = match snap.temperature {
        Temperature::Celsius(c) => format!("{c:.1}°C"),
        Temperature::Unavailable => "not available".to_string(),
    };

    [
        format!("🖥 {label}"),
        format!("🕒 {timestamp}"),
        String::new(),
        format!("CPU   {}", render_bar(snap.cpu_percent, 100.0, BAR_CELLS)),
        format!("RAM   {ram}"),
        format!("Disk  {disk}"),
        format!("Temp  {temp}"),
        format!(
            "Net   ↑ {:.2} MB  ↓ {:.2} MB",
            snap.net_sent as f64 / BYTES_PER_MB,
            snap.net_recv as f64 / BYTES_PER_MB
        ),
    ]
    .join("\n")
}

pub fn host_name() -> Option<String> {
    System::host_name()
}

/// `3d 4h 12m`; days are omitted when zero.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let mins = (seconds % 3600) / 60;
    if days > 0 {
        return format!("{days}d {hours}h {mins}m");
    }
    format!("{hours}h {mins}m")
}
