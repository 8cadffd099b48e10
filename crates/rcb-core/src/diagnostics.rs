//! Disk diagnostics: root filesystem usage and per-device SMART health.
//!
//! Nothing in here fails outward: every tool problem becomes one inline line in
//! the report.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::{
    errors::Error,
    tools::{with_sudo, ToolRunner},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiskHealth {
    /// Overall verdict as reported by the device, e.g. `PASSED`.
    Verdict(String),
    /// Device has no SMART support, or it is disabled.
    Unsupported,
    PermissionDenied,
    /// No data could be obtained; the reason is shown to the operator.
    Unavailable(String),
}

/// Best-effort block-device health probe.
#[async_trait]
pub trait DiskHealthSource: Send + Sync {
    /// Device paths such as `/dev/sda`.
    async fn devices(&self) -> Result<Vec<String>>;
    async fn health(&self, device: &str) -> DiskHealth;
}

#[derive(Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Deserialize)]
struct LsblkDevice {
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Parse `lsblk -d -n -J -o NAME,TYPE` output into whole-disk device paths.
pub fn parse_lsblk(json: &str) -> Result<Vec<String>> {
    let parsed: LsblkOutput = serde_json::from_str(json)?;
    Ok(parsed
        .blockdevices
        .into_iter()
        .filter(|d| d.kind.as_deref() == Some("disk"))
        .map(|d| format!("/dev/{}", d.name))
        .collect())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmartSupport {
    Enabled,
    Disabled,
    Unavailable,
    /// `smartctl -i` printed no support lines (typical for NVMe).
    Unreported,
}

/// Interpret the `SMART support is:` lines of `smartctl -i`.
pub fn parse_smart_support(info: &str) -> SmartSupport {
    let mut available = None;
    let mut enabled = None;

    for line in info.lines() {
        let Some(rest) = line.trim().strip_prefix("SMART support is:") else {
            continue;
        };
        let rest = rest.trim();
        if rest.starts_with("Available") {
            available = Some(true);
        } else if rest.starts_with("Unavailable") {
            available = Some(false);
        } else if rest.starts_with("Enabled") {
            enabled = Some(true);
        } else if rest.starts_with("Disabled") {
            enabled = Some(false);
        }
    }

    match (available, enabled) {
        (Some(false), _) => SmartSupport::Unavailable,
        (_, Some(false)) => SmartSupport::Disabled,
        (_, Some(true)) => SmartSupport::Enabled,
        (Some(true), None) => SmartSupport::Disabled,
        (None, None) => SmartSupport::Unreported,
    }
}

fn verdict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:SMART overall-health self-assessment test result|SMART Health Status):\s*(\S.*?)\s*$")
            .expect("valid regex")
    })
}

/// Extract the overall verdict from `smartctl -H` output (ATA and SCSI/NVMe forms).
pub fn parse_smart_verdict(health: &str) -> Option<String> {
    verdict_re()
        .captures(health)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn looks_like_permission_problem(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("permission denied")
        || lower.contains("operation not permitted")
        || lower.contains("a password is required")
        || lower.contains("root privileges")
}

/// smartctl-backed implementation of [`DiskHealthSource`].
pub struct SmartctlHealth {
    runner: Arc<dyn ToolRunner>,
    use_sudo: bool,
}

impl SmartctlHealth {
    pub fn new(runner: Arc<dyn ToolRunner>, use_sudo: bool) -> Self {
        Self { runner, use_sudo }
    }

    async fn smartctl(&self, flag: &str, device: &str) -> Result<crate::tools::ToolOutput> {
        let (program, args) = with_sudo(self.use_sudo, "smartctl", &[flag, device]);
        self.runner.run(program, &args).await
    }
}

#[async_trait]
impl DiskHealthSource for SmartctlHealth {
    async fn devices(&self) -> Result<Vec<String>> {
        let out = self
            .runner
            .run("lsblk", &["-d", "-n", "-J", "-o", "NAME,TYPE"])
            .await?;
        if !out.success() {
            return Err(Error::tool("lsblk", out.stderr.trim().to_string()));
        }
        parse_lsblk(&out.stdout).map_err(|e| Error::tool("lsblk", e.to_string()))
    }

    async fn health(&self, device: &str) -> DiskHealth {
        let info = match self.smartctl("-i", device).await {
            Ok(o) => o,
            Err(e) => return DiskHealth::Unavailable(e.to_string()),
        };
        if looks_like_permission_problem(&info.combined()) {
            return DiskHealth::PermissionDenied;
        }

        match parse_smart_support(&info.stdout) {
            SmartSupport::Unavailable | SmartSupport::Disabled => return DiskHealth::Unsupported,
            SmartSupport::Enabled | SmartSupport::Unreported => {}
        }

        let health = match self.smartctl("-H", device).await {
            Ok(o) => o,
            Err(e) => return DiskHealth::Unavailable(e.to_string()),
        };
        if looks_like_permission_problem(&health.combined()) {
            return DiskHealth::PermissionDenied;
        }

        match parse_smart_verdict(&health.stdout) {
            Some(v) => DiskHealth::Verdict(v),
            // smartctl exit bit 1: device open failed.
            None if health.status.is_some_and(|s| s & 0b10 != 0) => {
                DiskHealth::Unavailable("device open failed".to_string())
            }
            None => DiskHealth::Unsupported,
        }
    }
}

/// Collects the health report.
pub struct Diagnostics {
    runner: Arc<dyn ToolRunner>,
    disks: Arc<dyn DiskHealthSource>,
}

impl Diagnostics {
    pub fn new(runner: Arc<dyn ToolRunner>, disks: Arc<dyn DiskHealthSource>) -> Self {
        Self { runner, disks }
    }

    pub async fn report(&self) -> String {
        let mut lines = vec!["💾 Filesystem (/)".to_string()];
        lines.push(self.filesystem_usage().await);
        lines.push(String::new());
        lines.push("🩺 SMART health".to_string());
        lines.extend(self.device_health().await);
        lines.join("\n")
    }

    async fn filesystem_usage(&self) -> String {
        match self.runner.run("df", &["-h", "/"]).await {
            Ok(out) if out.success() => out.stdout.trim_end().to_string(),
            Ok(out) => error_line(&Error::tool("df", failure_reason(&out))),
            Err(e) => error_line(&e),
        }
    }

    async fn device_health(&self) -> Vec<String> {
        let devices = match self.disks.devices().await {
            Ok(d) => d,
            Err(e) => return vec![error_line(&e)],
        };
        if devices.is_empty() {
            return vec!["No block devices found.".to_string()];
        }

        let mut lines = Vec::with_capacity(devices.len());
        let mut denied = 0usize;
        for dev in &devices {
            let line = match self.disks.health(dev).await {
                DiskHealth::Verdict(v) => format!("{dev}: {v}"),
                DiskHealth::Unsupported => format!("{dev}: SMART not supported"),
                DiskHealth::PermissionDenied => {
                    denied += 1;
                    format!("{dev}: permission denied")
                }
                DiskHealth::Unavailable(reason) => format!("⚠️ {dev}: {reason}"),
            };
            lines.push(line);
        }

        if denied == devices.len() {
            return vec![
                "⚠️ Insufficient privileges to query SMART data (smartctl needs root).".to_string(),
            ];
        }
        lines
    }
}

fn failure_reason(out: &crate::tools::ToolOutput) -> String {
    let stderr = out.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match out.status {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn error_line(e: &Error) -> String {
    format!("⚠️ error: {e}")
}
