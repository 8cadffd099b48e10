//! Top processes by resident memory.

use sysinfo::System;

pub const TOP_N: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    /// Resident set size in bytes.
    pub memory: u64,
}

/// The `n` rows with the largest `memory`, descending. Ties keep input order.
pub fn top_by_memory(mut rows: Vec<ProcessRow>, n: usize) -> Vec<ProcessRow> {
    rows.sort_by(|a, b| b.memory.cmp(&a.memory));
    rows.truncate(n);
    rows
}

pub fn snapshot_processes() -> Vec<ProcessRow> {
    let mut sys = System::new();
    sys.refresh_processes();
    sys.processes()
        .iter()
        .map(|(pid, p)| ProcessRow {
            pid: pid.as_u32(),
            name: p.name().to_string(),
            memory: p.memory(),
        })
        .collect()
}

pub fn render_top(rows: &[ProcessRow]) -> String {
    if rows.is_empty() {
        return "No processes visible.".to_string();
    }

    let mut lines = vec![format!("{:>7}  {:>9}  {}", "PID", "MEM(MB)", "NAME")];
    lines.extend(rows.iter().map(|r| {
        format!(
            "{:>7}  {:>9.1}  {}",
            r.pid,
            r.memory as f64 / (1024.0 * 1024.0),
            r.name
        )
    }));
    lines.join("\n")
}
