/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulator subprocess.
//!
//! One run invokes
//! `<binary> -i <scenario> -p <platform> <policy flags...> -o <trace.json>`
//! and decodes the trace it writes.  The output file is a scratch file that
//! is removed once the trace has been read.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::RunError;
use crate::trace::{parse_trace, TraceEntry};

/// Longest stderr excerpt kept in a [`RunError::SimulatorFailed`].
const STDERR_EXCERPT: usize = 512;

/// How to invoke the simulator under test.
#[derive(Debug, Clone)]
pub struct Simulator {
    pub binary: PathBuf,
    pub platform: PathBuf,
    pub timeout: Duration,
}

impl Simulator {
    pub fn new(binary: PathBuf, platform: PathBuf, timeout: Duration) -> Self {
        Self {
            binary,
            platform,
            timeout,
        }
    }

    /// Run the simulator on `scenario` with `flags` and return its trace.
    ///
    /// # Errors
    /// Every failure maps to a [`RunError`]: the run is inconclusive.
    pub async fn run(&self, scenario: &Path, flags: &[String]) -> Result<Vec<TraceEntry>, RunError> {
        let output_file = tempfile::Builder::new()
            .prefix("grubcheck-")
            .suffix(".json")
            .tempfile()
            .map_err(RunError::TraceIo)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("-i")
            .arg(scenario)
            .arg("-p")
            .arg(&self.platform)
            .args(flags)
            .arg("-o")
            .arg(output_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            binary = %self.binary.display(),
            scenario = %scenario.display(),
            flags = ?flags,
            "Starting simulator"
        );

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|source| RunError::Spawn {
                path: self.binary.clone(),
                source,
            })?,
            Err(_) => {
                return Err(RunError::Timeout {
                    timeout: self.timeout,
                })
            }
        };

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |code| format!("status {code}"));
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(RunError::SimulatorFailed { status, stderr });
        }

        let content = tokio::fs::read_to_string(output_file.path())
            .await
            .map_err(RunError::TraceIo)?;
        parse_trace(&content).map_err(RunError::TraceParse)
    }
}
