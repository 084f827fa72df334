/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scenario discovery.
//!
//! Hand-crafted scenarios are the `*.json` files directly inside their
//! directory.  Generated scenarios follow the naming scheme
//! `u<level>_<n>.json`, e.g. `u.50_1.json` or `u1.00_3.json`, where the
//! level is the total utilization the generator targeted.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::RunConfig;

/// One scenario file selected for checking.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSpec {
    /// File name without the `.json` extension.
    pub name: String,
    pub path: PathBuf,
    /// Target utilization of a generated scenario.
    pub util_level: Option<f64>,
}

impl ScenarioSpec {
    /// `U=<level>` label for generated scenarios.
    pub fn util_label(&self) -> Option<String> {
        self.util_level.map(util_label)
    }
}

/// Format a utilization level the way summaries group it.
pub fn util_label(level: f64) -> String {
    format!("U={level:.2}")
}

/// Utilization level encoded in a generated scenario file name, or `None`
/// if `file_name` does not follow `u<digits>.<digits>_<digits>.json`
/// (leading digits optional).
pub fn parse_util_level(file_name: &str) -> Option<f64> {
    let stem = file_name.strip_prefix('u')?.strip_suffix(".json")?;
    let (level, index) = stem.split_once('_')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (whole, frac) = level.split_once('.')?;
    if frac.is_empty()
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    level.parse().ok()
}

fn matches_filter(file_name: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |f| file_name.contains(f))
}

/// `(file name, path)` of every regular file directly inside `dir`,
/// including symlinks to regular files.
fn list_files(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.push((name.to_string(), path));
        }
    }
    Ok(files)
}

fn stem(file_name: &str) -> String {
    file_name
        .strip_suffix(".json")
        .unwrap_or(file_name)
        .to_string()
}

/// Hand-crafted scenarios in `dir`, sorted by file name.
///
/// Skips the configured non-scenario files and anything named like a
/// generated scenario.
pub fn discover_handcrafted(
    dir: &Path,
    config: &RunConfig,
    filter: Option<&str>,
) -> io::Result<Vec<ScenarioSpec>> {
    let mut found: Vec<ScenarioSpec> = list_files(dir)?
        .into_iter()
        .filter(|(name, _)| name.ends_with(".json"))
        .filter(|(name, _)| !config.is_skipped(name))
        .filter(|(name, _)| parse_util_level(name).is_none())
        .filter(|(name, _)| matches_filter(name, filter))
        .map(|(name, path)| ScenarioSpec {
            name: stem(&name),
            path,
            util_level: None,
        })
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(dir = %dir.display(), count = found.len(), "Hand-crafted scenarios");
    Ok(found)
}

/// Generated scenarios in `dir`, sorted by (level, file name).
pub fn discover_generated(dir: &Path, filter: Option<&str>) -> io::Result<Vec<ScenarioSpec>> {
    let mut found: Vec<(String, ScenarioSpec)> = list_files(dir)?
        .into_iter()
        .filter(|(name, _)| matches_filter(name, filter))
        .filter_map(|(name, path)| {
            let level = parse_util_level(&name)?;
            let spec = ScenarioSpec {
                name: stem(&name),
                path,
                util_level: Some(level),
            };
            Some((name, spec))
        })
        .collect();
    found.sort_by(|(an, a), (bn, b)| {
        let (la, lb) = (a.util_level.unwrap_or(0.0), b.util_level.unwrap_or(0.0));
        la.total_cmp(&lb).then_with(|| an.cmp(bn))
    });

    debug!(dir = %dir.display(), count = found.len(), "Generated scenarios");
    Ok(found.into_iter().map(|(_, spec)| spec).collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
