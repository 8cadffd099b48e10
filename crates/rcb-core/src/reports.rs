//! Report generation behind one seam, so the router never touches host APIs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use sysinfo::System;

use crate::{
    diagnostics::Diagnostics,
    processes::{render_top, snapshot_processes, top_by_memory, TOP_N},
    telemetry::{self, format_uptime, TemperatureSource},
};

/// Fresh, uncached text reports about the host.
#[async_trait]
pub trait HostReports: Send + Sync {
    async fn status(&self) -> String;
    async fn health(&self) -> String;
    async fn top(&self) -> String;
    async fn uptime(&self) -> String;
}

pub struct HostInspector {
    label: String,
    temperature: Arc<dyn TemperatureSource>,
    diagnostics: Diagnostics,
}

impl HostInspector {
    pub fn new(
        label: impl Into<String>,
        temperature: Arc<dyn TemperatureSource>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            label: label.into(),
            temperature,
            diagnostics,
        }
    }
}

pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[async_trait]
impl HostReports for HostInspector {
    async fn status(&self) -> String {
        let snap = telemetry::sample(self.temperature.as_ref()).await;
        telemetry::render_status(&self.label, &snap, &timestamp())
    }

    async fn health(&self) -> String {
        let body = self.diagnostics.report().await;
        format!("🖥 {}\n🕒 {}\n\n{body}", self.label, timestamp())
    }

    async fn top(&self) -> String {
        let rows = top_by_memory(snapshot_processes(), TOP_N);
        format!("🔝 Top {TOP_N} by memory\n\n{}", render_top(&rows))
    }

    async fn uptime(&self) -> String {
        format_uptime(System::uptime())
    }
}
