//! Platform topology loading.
//!
//! The platform describes one or more clusters of identical processors
//! sharing a clock domain.  The expected JSON structure is:
//! ```json
//! {
//!   "clusters": [
//!     { "procs": 4, "frequencies": [1400, 1200, 1000, 800],
//!       "effective_freq": 800, "perf_score": 1.0 }
//!   ]
//! }
//! ```
//!
//! Cluster ids are the 0-based declaration index, matching the clock domain
//! ids the simulator writes into its trace.  The first declared cluster is
//! the *reference* cluster: every other cluster's bandwidth is normalised
//! against its maximum frequency via [`ClusterInfo::scale_speed`].

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::LoadError;

/// Index of a cluster in platform declaration order.
pub type ClusterId = usize;

// ── Private JSON deserialization types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlatformFile {
    clusters: Vec<ClusterEntry>,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    procs: usize,
    frequencies: Vec<f64>,
    effective_freq: f64,
    perf_score: f64,
}

// ── Public data structures ────────────────────────────────────────────────────

/// One cluster of the platform.  Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterInfo {
    pub id: ClusterId,
    /// Number of processors `m`.
    pub num_procs: usize,
    /// Available operating frequencies, sorted descending.
    pub frequencies: Vec<f64>,
    /// Floor frequency below which the DVFS policy will not operate.
    /// `0.0` means no floor.
    pub effective_freq: f64,
    /// Relative per-cycle throughput.
    pub perf_score: f64,
    /// Highest entry of `frequencies`.
    pub freq_max: f64,
    /// `reference.freq_max / self.freq_max`.
    pub scale_speed: f64,
}

impl ClusterInfo {
    /// Round `freq` up to the next available operating frequency.
    ///
    /// * Returns the smallest mode `>= freq`.
    /// * If `freq` exceeds every mode, returns the maximum mode.
    /// * If `freq` is at or below the minimum mode, returns the minimum mode.
    pub fn ceil_to_mode(&self, freq: f64) -> f64 {
        // `frequencies` is descending: the answer is the entry just before
        // the first one that falls strictly below `freq`.
        match self.frequencies.iter().position(|&f| f < freq) {
            Some(0) => self.freq_max,
            Some(i) => self.frequencies[i - 1],
            None => self.frequencies.last().copied().unwrap_or(self.freq_max),
        }
    }

    /// Normalise a nominal task utilization onto this cluster's bandwidth
    /// unit: `u * scale_speed / perf_score`.
    pub fn scale_utilization(&self, utilization: f64) -> f64 {
        utilization * self.scale_speed / self.perf_score
    }
}

/// The loaded platform: clusters in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    clusters: Vec<ClusterInfo>,
}

impl Platform {
    /// Parse the platform file at `path`.
    ///
    /// # Errors
    /// * [`LoadError::Io`] / [`LoadError::Parse`] – unreadable or
    ///   structurally invalid JSON.
    /// * [`LoadError::EmptyPlatform`] – no cluster declared.
    /// * [`LoadError::NoFrequencies`] – a cluster without any frequency.
    pub fn load_from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: PlatformFile =
            serde_json::from_str(&content).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let platform = Self::from_entries(file.clusters, path)?;

        info!(
            path = %path.display(),
            clusters = platform.clusters.len(),
            "Loaded platform"
        );
        for c in &platform.clusters {
            debug!(
                cluster = c.id,
                procs = c.num_procs,
                frequencies = ?c.frequencies,
                perf_score = c.perf_score,
                scale_speed = c.scale_speed,
                "  cluster"
            );
        }
        Ok(platform)
    }

    fn from_entries(entries: Vec<ClusterEntry>, path: &Path) -> Result<Self, LoadError> {
        if entries.is_empty() {
            return Err(LoadError::EmptyPlatform {
                path: path.to_path_buf(),
            });
        }

        let mut clusters = Vec::with_capacity(entries.len());
        for (id, entry) in entries.into_iter().enumerate() {
            let mut frequencies = entry.frequencies;
            frequencies.sort_by(|a, b| b.total_cmp(a));
            let freq_max = *frequencies.first().ok_or_else(|| LoadError::NoFrequencies {
                path: path.to_path_buf(),
                cluster: id,
            })?;
            clusters.push(ClusterInfo {
                id,
                num_procs: entry.procs,
                frequencies,
                effective_freq: entry.effective_freq,
                perf_score: entry.perf_score,
                freq_max,
                scale_speed: 1.0,
            });
        }

        let reference = clusters[0].freq_max;
        for c in &mut clusters {
            c.scale_speed = reference / c.freq_max;
        }

        Ok(Self { clusters })
    }

    /// Build a platform directly from cluster descriptions (no file).
    ///
    /// Each tuple is `(procs, frequencies, effective_freq, perf_score)`.
    /// Used by tests and tooling that synthesise platforms in memory.
    pub fn from_clusters(
        clusters: Vec<(usize, Vec<f64>, f64, f64)>,
    ) -> Result<Self, LoadError> {
        let entries = clusters
            .into_iter()
            .map(|(procs, frequencies, effective_freq, perf_score)| ClusterEntry {
                procs,
                frequencies,
                effective_freq,
                perf_score,
            })
            .collect();
        Self::from_entries(entries, Path::new("<memory>"))
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&ClusterInfo> {
        self.clusters.get(id)
    }

    pub fn clusters(&self) -> &[ClusterInfo] {
        &self.clusters
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
