/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for grubcheck.
//!
//! Two error enums model the two scoped failure layers:
//!
//! * [`LoadError`]: a platform or scenario description could not be read.
//!   Fatal for the platform (the whole job aborts), scoped to one scenario
//!   otherwise.
//! * [`RunError`]: one (scenario, policy) run could not produce a usable
//!   trace.  The run is reported as SKIP; nothing else is affected.
//!
//! Invariant violations are **not** errors: they are plain data
//! ([`Violation`](crate::checker::Violation)) accumulated by the checker.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ── Load errors ───────────────────────────────────────────────────────────────

/// Failure to load a platform or scenario description.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or does not have the expected structure.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The platform declares no cluster, so there is no reference cluster
    /// to normalise bandwidths against.
    #[error("platform {} declares no cluster", .path.display())]
    EmptyPlatform { path: PathBuf },

    /// A cluster declares an empty frequency list (no `freq_max`).
    #[error("cluster {cluster} in {} declares no operating frequency", .path.display())]
    NoFrequencies { path: PathBuf, cluster: usize },
}

// ── Run errors ────────────────────────────────────────────────────────────────

/// Why a single (scenario, policy) run is inconclusive.
///
/// | Variant | Cause |
/// |---|---|
/// | `Scenario` | scenario file failed to load, the simulator was never started |
/// | `Spawn` | simulator binary could not be executed |
/// | `Timeout` | simulator exceeded the per-run timeout and was killed |
/// | `SimulatorFailed` | simulator exited with a non-zero status |
/// | `TraceIo` / `TraceParse` | trace output missing or malformed |
/// | `Checker` | the checker task did not complete |
#[derive(Debug, Error)]
pub enum RunError {
    #[error("scenario could not be loaded: {0}")]
    Scenario(String),

    #[error("failed to start simulator {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("simulator timed out after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    #[error("simulator exited with {status}: {stderr}")]
    SimulatorFailed { status: String, stderr: String },

    #[error("cannot read trace output: {0}")]
    TraceIo(#[source] std::io::Error),

    #[error("malformed trace output: {0}")]
    TraceParse(#[source] serde_json::Error),

    #[error("checker task failed: {0}")]
    Checker(String),
}
