//! Running external utilities (`df`, `lsblk`, `smartctl`, `systemctl`).

use std::{io::ErrorKind, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{errors::Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Both streams, for scanning diagnostics that may land on either.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `program` to completion and capture its output.
    ///
    /// A nonzero exit is not an error here; callers interpret the status. A missing
    /// binary or spawn failure is.
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemToolRunner;

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput> {
        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(program, e))?;

        Ok(ToolOutput {
            status: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

pub(crate) fn spawn_error(program: &str, e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::NotFound => Error::tool(program, "not installed"),
        ErrorKind::PermissionDenied => Error::tool(program, "permission denied"),
        _ => Error::tool(program, e.to_string()),
    }
}

/// Prefix `args` with `sudo -n` (non-interactive) when `use_sudo` is set.
pub fn with_sudo<'a>(
    use_sudo: bool,
    program: &'a str,
    args: &[&'a str],
) -> (&'a str, Vec<&'a str>) {
    if use_sudo {
        let mut v = vec!["-n", program];
        v.extend_from_slice(args);
        ("sudo", v)
    } else {
        (program, args.to_vec())
    }
}
