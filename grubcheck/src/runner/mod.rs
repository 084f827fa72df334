/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Run orchestrator.
//!
//! A batch is every (scenario, policy) pair of a set of scenarios.  Each
//! pair is an independent run: simulate, decode the trace, check it with a
//! fresh tracker.  Runs execute concurrently on the tokio runtime, bounded
//! by a semaphore; the checker itself runs on the blocking pool.
//!
//! Failures are scoped.  A scenario that cannot be loaded marks all of its
//! runs SKIP; a simulator failure or malformed trace marks one run SKIP.
//! Nothing aborts the batch.

pub mod discovery;
pub mod simulator;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub use discovery::{discover_generated, discover_handcrafted, parse_util_level, ScenarioSpec};
pub use simulator::Simulator;

use crate::checker::{verify_trace, TraceReport, Violation};
use crate::config::RunConfig;
use crate::error::RunError;
use crate::platform::Platform;
use crate::policy::Policy;
use crate::scenario::{load_scenario, TaskInfo};

// ── Run results ───────────────────────────────────────────────────────────────

/// How a single run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The trace was checked; the report may contain violations.
    Completed(TraceReport),
    /// No usable trace; the run is inconclusive.
    Skipped(RunError),
}

/// Result of one (scenario, policy) run.
#[derive(Debug)]
pub struct RunResult {
    pub scenario: String,
    pub util_level: Option<f64>,
    pub policy: Policy,
    pub outcome: RunOutcome,
}

impl RunResult {
    /// `scenario:policy`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.scenario, self.policy)
    }

    /// Violations of a completed run, `None` for a skipped one.
    pub fn violations(&self) -> Option<&[Violation]> {
        match &self.outcome {
            RunOutcome::Completed(report) => Some(&report.violations),
            RunOutcome::Skipped(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.violations().is_some_and(|v| !v.is_empty())
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, RunOutcome::Skipped(_))
    }

    /// `PASS`, `FAIL(n)` or `SKIP`.
    pub fn status(&self) -> String {
        match self.violations() {
            None => "SKIP".to_string(),
            Some([]) => "PASS".to_string(),
            Some(v) => format!("FAIL({})", v.len()),
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Runs batches of scenarios against the simulator.
pub struct Orchestrator {
    platform: Arc<Platform>,
    simulator: Arc<Simulator>,
    config: Arc<RunConfig>,
    jobs: usize,
    dump_violations: bool,
}

impl Orchestrator {
    /// `jobs` bounds the number of concurrent runs (at least one).
    pub fn new(
        platform: Platform,
        simulator: Simulator,
        config: RunConfig,
        jobs: usize,
        dump_violations: bool,
    ) -> Self {
        Self {
            platform: Arc::new(platform),
            simulator: Arc::new(simulator),
            config: Arc::new(config),
            jobs: jobs.max(1),
            dump_violations,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every configured policy on every scenario.
    ///
    /// `on_progress(done, total, result)` is called as each run finishes,
    /// in completion order.  The returned results are in (scenario, policy)
    /// order regardless of completion order, and contain exactly one entry
    /// per pair.
    pub async fn run_all<F>(&self, scenarios: &[ScenarioSpec], mut on_progress: F) -> Vec<RunResult>
    where
        F: FnMut(usize, usize, &RunResult),
    {
        let policies = self.config.policies.clone();
        let total = scenarios.len() * policies.len();
        let mut slots: Vec<Option<RunResult>> = (0..total).map(|_| None).collect();
        let mut done = 0;

        info!(
            scenarios = scenarios.len(),
            runs = total,
            jobs = self.jobs,
            "Starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut pending = JoinSet::new();

        for (si, spec) in scenarios.iter().enumerate() {
            let tasks = match load_scenario(&spec.path) {
                Ok(tasks) => Arc::new(tasks),
                Err(e) => {
                    warn!(scenario = %spec.name, error = %e, "Scenario skipped");
                    for (pi, &policy) in policies.iter().enumerate() {
                        let result = RunResult {
                            scenario: spec.name.clone(),
                            util_level: spec.util_level,
                            policy,
                            outcome: RunOutcome::Skipped(RunError::Scenario(e.to_string())),
                        };
                        done += 1;
                        on_progress(done, total, &result);
                        slots[si * policies.len() + pi] = Some(result);
                    }
                    continue;
                }
            };

            for (pi, &policy) in policies.iter().enumerate() {
                let job = RunJob {
                    slot: si * policies.len() + pi,
                    scenario: spec.name.clone(),
                    util_level: spec.util_level,
                    path: spec.path.clone(),
                    policy,
                    flags: self.config.flags_for(policy),
                    tasks: Arc::clone(&tasks),
                };
                let semaphore = Arc::clone(&semaphore);
                let platform = Arc::clone(&self.platform);
                let simulator = Arc::clone(&self.simulator);
                let dump = self.dump_violations;

                pending.spawn(async move {
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) => job.execute(&simulator, platform, dump).await,
                        Err(e) => RunOutcome::Skipped(RunError::Checker(e.to_string())),
                    };
                    (job.slot, job.into_result(outcome))
                });
            }
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((slot, result)) => {
                    done += 1;
                    on_progress(done, total, &result);
                    slots[slot] = Some(result);
                }
                Err(e) => error!(error = %e, "Run task aborted"),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// Everything one spawned run needs, owned.
struct RunJob {
    slot: usize,
    scenario: String,
    util_level: Option<f64>,
    path: PathBuf,
    policy: Policy,
    flags: Vec<String>,
    tasks: Arc<Vec<TaskInfo>>,
}

impl RunJob {
    async fn execute(&self, simulator: &Simulator, platform: Arc<Platform>, dump: bool) -> RunOutcome {
        let trace = match simulator.run(&self.path, &self.flags).await {
            Ok(trace) => trace,
            Err(e) => {
                warn!(
                    scenario = %self.scenario,
                    policy = %self.policy,
                    error = %e,
                    "Run inconclusive"
                );
                return RunOutcome::Skipped(e);
            }
        };

        let tasks = Arc::clone(&self.tasks);
        let policy = self.policy;
        let checked = tokio::task::spawn_blocking(move || {
            verify_trace(&trace, &platform, &tasks, policy, dump)
        })
        .await;

        match checked {
            Ok(report) => RunOutcome::Completed(report),
            Err(e) => RunOutcome::Skipped(RunError::Checker(e.to_string())),
        }
    }

    fn into_result(self, outcome: RunOutcome) -> RunResult {
        RunResult {
            scenario: self.scenario,
            util_level: self.util_level,
            policy: self.policy,
            outcome,
        }
    }
}

/// Check a trace file already on disk, without running the simulator.
pub fn check_trace_file(
    trace: &Path,
    platform: &Platform,
    scenario: &Path,
    policy: Policy,
    dump_violations: bool,
) -> Result<TraceReport, RunError> {
    let tasks = load_scenario(scenario).map_err(|e| RunError::Scenario(e.to_string()))?;
    let entries = crate::trace::load_trace(trace)?;
    Ok(verify_trace(&entries, platform, &tasks, policy, dump_violations))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
