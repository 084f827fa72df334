/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Declared task set of one scenario.
//!
//! ```json
//! { "tasks": [ { "id": 1, "utilization": 0.25, "period": 10.0,
//!                "jobs": [ { "arrival": 0.0, "duration": 2.5 } ] } ] }
//! ```
//!
//! Only the fields the checker needs are read: the declared utilization and
//! period (to seed server trackers) and the job arrival timestamps (to decide
//! whether a server that turns inactive is detached from the scheduler).

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::LoadError;

/// Task identifier as written by the simulator (`tid`).
pub type TaskId = u64;

// ── Private JSON deserialization types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    id: TaskId,
    utilization: f64,
    period: f64,
    #[serde(default)]
    jobs: Vec<JobEntry>,
}

#[derive(Debug, Deserialize)]
struct JobEntry {
    arrival: f64,
}

// ── TaskInfo ──────────────────────────────────────────────────────────────────

/// One declared task.  Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub id: TaskId,
    /// Declared nominal utilization.
    pub utilization: f64,
    pub period: f64,
    /// Declared job arrival times, sorted ascending.
    pub job_arrivals: Vec<f64>,
}

impl TaskInfo {
    pub fn new(id: TaskId, utilization: f64, period: f64, mut job_arrivals: Vec<f64>) -> Self {
        job_arrivals.sort_by(f64::total_cmp);
        Self {
            id,
            utilization,
            period,
            job_arrivals,
        }
    }
}

/// Parse the scenario file at `path`.
///
/// # Errors
/// [`LoadError::Io`] or [`LoadError::Parse`].  Callers treat either as a
/// scoped skip of this scenario only.
pub fn load_scenario(path: &Path) -> Result<Vec<TaskInfo>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ScenarioFile = serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let tasks: Vec<TaskInfo> = file
        .tasks
        .into_iter()
        .map(|t| {
            TaskInfo::new(
                t.id,
                t.utilization,
                t.period,
                t.jobs.into_iter().map(|j| j.arrival).collect(),
            )
        })
        .collect();

    debug!(path = %path.display(), tasks = tasks.len(), "Loaded scenario");
    Ok(tasks)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
