/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Run configuration loading.
//!
//! Every key is optional; missing keys fall back to [`RunConfig::default`].
//! The expected YAML structure is:
//! ```yaml
//! timeout_secs: 60
//! policies: [grub, pa, ffa, csf]
//! policy_flags:
//!   pa: ["--reclaim", "grub", "--dvfs", "power-aware"]
//! skip_files: ["ci-output.json", "ci-input.json", "ex1.json", "ex2.json"]
//! max_failure_details: 10
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::policy::Policy;

/// Default simulator timeout per run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of failure details per invariant in the generated summary.
pub const DEFAULT_MAX_FAILURE_DETAILS: usize = 10;

/// Hand-crafted scenario files that are not runnable scenarios.
pub const DEFAULT_SKIP_FILES: [&str; 4] =
    ["ci-output.json", "ci-input.json", "ex1.json", "ex2.json"];

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunConfigFile {
    timeout_secs: Option<u64>,
    policies: Option<Vec<Policy>>,
    #[serde(default)]
    policy_flags: BTreeMap<Policy, Vec<String>>,
    skip_files: Option<Vec<String>>,
    max_failure_details: Option<usize>,
}

// ── RunConfig ─────────────────────────────────────────────────────────────────

/// Settings shared by every run of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Simulator timeout per (scenario, policy) run.
    pub timeout: Duration,
    /// Policies to run, in reporting order.
    pub policies: Vec<Policy>,
    /// Simulator flags per policy.
    pub policy_flags: BTreeMap<Policy, Vec<String>>,
    /// File names in the hand-crafted directory that are never run.
    pub skip_files: Vec<String>,
    /// Cap on failure details per invariant in the generated summary.
    pub max_failure_details: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            policies: Policy::ALL.to_vec(),
            policy_flags: Policy::ALL
                .into_iter()
                .map(|p| (p, p.default_flags()))
                .collect(),
            skip_files: DEFAULT_SKIP_FILES.iter().map(|s| s.to_string()).collect(),
            max_failure_details: DEFAULT_MAX_FAILURE_DETAILS,
        }
    }
}

impl RunConfig {
    /// Load `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Parse the YAML file at `path`, overlaying it on the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid YAML, names
    /// an unknown key or policy, or selects no policy at all.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading run configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;
        let file: RunConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let config = Self::from_file(file)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        debug!(
            timeout_secs = config.timeout.as_secs(),
            policies = ?config.policies,
            skip_files = ?config.skip_files,
            max_failure_details = config.max_failure_details,
            "Run configuration"
        );
        Ok(config)
    }

    fn from_file(file: RunConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = file.timeout_secs {
            if secs == 0 {
                bail!("timeout_secs must be positive");
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(policies) = file.policies {
            let mut unique = Vec::with_capacity(policies.len());
            for p in policies {
                if !unique.contains(&p) {
                    unique.push(p);
                }
            }
            if unique.is_empty() {
                bail!("policies must name at least one policy");
            }
            config.policies = unique;
        }
        config.policy_flags.extend(file.policy_flags);
        if let Some(skip) = file.skip_files {
            config.skip_files = skip;
        }
        if let Some(n) = file.max_failure_details {
            config.max_failure_details = n;
        }
        Ok(config)
    }

    /// Simulator flags for `policy`.
    pub fn flags_for(&self, policy: Policy) -> Vec<String> {
        self.policy_flags
            .get(&policy)
            .cloned()
            .unwrap_or_else(|| policy.default_flags())
    }

    pub fn is_skipped(&self, file_name: &str) -> bool {
        self.skip_files.iter().any(|s| s == file_name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
