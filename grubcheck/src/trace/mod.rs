/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Trace event model.
//!
//! The simulator writes its trace as a flat JSON array, one object per
//! event, each carrying the wall-clock `time` and a `type` tag:
//!
//! ```json
//! [ { "time": 0.0, "type": "serv_ready", "sid": 0, "tid": 1,
//!     "deadline": 10.0, "utilization": 0.25 },
//!   { "time": 0.0, "type": "task_scheduled", "tid": 1, "cpu": 0 } ]
//! ```
//!
//! Decoding into the closed [`Event`] enum means an unknown `type` makes the
//! whole trace malformed rather than silently ignored.  Fields the checker
//! does not use (`sid`, `duration`, ...) are skipped.

use std::path::Path;

use serde::Deserialize;

use crate::platform::ClusterId;
use crate::scenario::TaskId;

/// Processor identifier (`cpu`).
pub type CpuId = u64;

/// One decoded trace event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    JobArrival { tid: TaskId },
    JobFinished { tid: TaskId },
    TaskPlaced { tid: TaskId, cluster_id: ClusterId },
    TaskScheduled { tid: TaskId, cpu: CpuId },
    TaskPreempted { tid: TaskId },
    TaskRejected { tid: TaskId },
    ServReady { tid: TaskId, deadline: f64, utilization: f64 },
    ServRunning { tid: TaskId },
    ServNonCont { tid: TaskId },
    ServInactive { tid: TaskId },
    ServPostpone { tid: TaskId, deadline: f64 },
    ServBudgetReplenished { tid: TaskId, budget: f64 },
    ServBudgetExhausted { tid: TaskId },
    VirtualTimeUpdate {
        tid: TaskId,
        virtual_time: f64,
        /// Simulator-side bandwidth, only present in newer traces.  Used for
        /// diagnostics, never for checking.
        #[serde(default)]
        bandwidth: Option<f64>,
    },
    FrequencyUpdate { cluster_id: ClusterId, frequency: f64 },
    ProcActivated { cpu: CpuId },
    ProcIdled { cpu: CpuId },
    ProcSleep { cpu: CpuId },
    ProcChange { cpu: CpuId },
    Resched,
    SimFinished,
    MigrationCluster { tid: TaskId, cluster_id: ClusterId },
}

impl Event {
    /// The `type` tag as written in the trace.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::JobArrival { .. } => "job_arrival",
            Event::JobFinished { .. } => "job_finished",
            Event::TaskPlaced { .. } => "task_placed",
            Event::TaskScheduled { .. } => "task_scheduled",
            Event::TaskPreempted { .. } => "task_preempted",
            Event::TaskRejected { .. } => "task_rejected",
            Event::ServReady { .. } => "serv_ready",
            Event::ServRunning { .. } => "serv_running",
            Event::ServNonCont { .. } => "serv_non_cont",
            Event::ServInactive { .. } => "serv_inactive",
            Event::ServPostpone { .. } => "serv_postpone",
            Event::ServBudgetReplenished { .. } => "serv_budget_replenished",
            Event::ServBudgetExhausted { .. } => "serv_budget_exhausted",
            Event::VirtualTimeUpdate { .. } => "virtual_time_update",
            Event::FrequencyUpdate { .. } => "frequency_update",
            Event::ProcActivated { .. } => "proc_activated",
            Event::ProcIdled { .. } => "proc_idled",
            Event::ProcSleep { .. } => "proc_sleep",
            Event::ProcChange { .. } => "proc_change",
            Event::Resched => "resched",
            Event::SimFinished => "sim_finished",
            Event::MigrationCluster { .. } => "migration_cluster",
        }
    }
}

/// A timestamped trace event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceEntry {
    pub time: f64,
    #[serde(flatten)]
    pub event: Event,
}

impl TraceEntry {
    pub fn new(time: f64, event: Event) -> Self {
        Self { time, event }
    }
}

/// Decode a whole trace from its JSON text.
pub fn parse_trace(json: &str) -> Result<Vec<TraceEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read and decode the trace file at `path`.
pub fn load_trace(path: &Path) -> Result<Vec<TraceEntry>, crate::error::RunError> {
    let content = std::fs::read_to_string(path).map_err(crate::error::RunError::TraceIo)?;
    parse_trace(&content).map_err(crate::error::RunError::TraceParse)
}

/// Split a trace into same-timestamp batches, preserving stream order.
pub fn batches(entries: &[TraceEntry]) -> impl Iterator<Item = &[TraceEntry]> {
    entries.chunk_by(|a, b| a.time == b.time)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
