/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Text summaries of a batch.
//!
//! Hand-crafted scenarios get one row per (scenario, policy) with a status
//! column per invariant.  Generated scenarios are numerous, so they are
//! aggregated per (utilization level, policy) with a bounded list of
//! failure details per invariant.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::checker::{InvariantKind, Violation};
use crate::policy::Policy;
use crate::runner::discovery::util_label;
use crate::runner::RunResult;

const MIN_NAME_WIDTH: usize = 20;
const MIN_CELL_WIDTH: usize = 8;

/// `true` when no completed run recorded a violation.  Skipped runs do not
/// count as failures.
pub fn all_passed(results: &[RunResult]) -> bool {
    !results.iter().any(RunResult::is_failure)
}

fn violation_line(v: &Violation) -> String {
    match v.tid {
        Some(tid) => format!("t={:.6} tid={tid} {}", v.time, v.message),
        None => format!("t={:.6} {}", v.time, v.message),
    }
}

// ── Hand-crafted summary ──────────────────────────────────────────────────────

/// Status of one invariant for one run.
fn cell(result: &RunResult, kind: InvariantKind) -> &'static str {
    let Some(violations) = result.violations() else {
        return "SKIP";
    };
    if !kind.applies_to(result.policy) {
        "N/A"
    } else if violations.iter().any(|v| v.kind == kind) {
        "FAIL"
    } else {
        "PASS"
    }
}

/// Per-run table followed by the first failure of every
/// (scenario, policy, invariant).
pub fn handcrafted_summary(results: &[RunResult]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "No results to display.");
        return out;
    }

    let mut rows: Vec<&RunResult> = results.iter().collect();
    rows.sort_by(|a, b| (&a.scenario, a.policy).cmp(&(&b.scenario, b.policy)));

    let name_width = rows
        .iter()
        .map(|r| r.label().len())
        .max()
        .unwrap_or(0)
        .max(MIN_NAME_WIDTH);

    let mut header = format!("{:<name_width$}", "Scenario");
    for kind in InvariantKind::ALL {
        let w = kind.label().len().max(MIN_CELL_WIDTH);
        let _ = write!(header, " | {:>w$}", kind.label());
    }
    let rule = "=".repeat(header.len());
    let _ = writeln!(out, "{rule}\n{header}\n{}", "-".repeat(header.len()));

    for r in &rows {
        let _ = write!(out, "{:<name_width$}", r.label());
        for kind in InvariantKind::ALL {
            let w = kind.label().len().max(MIN_CELL_WIDTH);
            let _ = write!(out, " | {:>w$}", cell(r, kind));
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "{rule}");

    let mut first: BTreeMap<(&str, Policy, InvariantKind), &Violation> = BTreeMap::new();
    for r in &rows {
        for v in r.violations().unwrap_or_default() {
            first.entry((r.scenario.as_str(), r.policy, v.kind)).or_insert(v);
        }
    }
    if !first.is_empty() {
        let _ = writeln!(
            out,
            "\nFAILURE DETAILS (first occurrence per scenario/policy/invariant):"
        );
        let _ = writeln!(out, "{}", "-".repeat(80));
        for ((scenario, policy, kind), v) in &first {
            let _ = writeln!(out, "  [{scenario}:{policy}] {}:", kind.label());
            let _ = writeln!(out, "    {}", violation_line(v));
        }
    }

    if all_passed(results) {
        let _ = writeln!(out, "\nAll invariants PASSED for all scenarios.");
    } else {
        let _ = writeln!(out, "\nSome invariants FAILED. See details above.");
    }
    out
}

// ── Generated summary ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Group {
    pass: usize,
    fail: usize,
    skip: usize,
    failed: BTreeSet<&'static str>,
}

/// Aggregate table per (utilization level, policy) followed by up to
/// `max_details` failures per invariant kind.
pub fn generated_summary(results: &[RunResult], max_details: usize) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "No generated results to display.");
        return out;
    }

    let mut groups: Vec<((f64, Policy), Group)> = Vec::new();
    for r in results {
        let key = (r.util_level.unwrap_or(0.0), r.policy);
        let idx = match groups.iter().position(|(k, _)| *k == key) {
            Some(i) => i,
            None => {
                groups.push((key, Group::default()));
                groups.len() - 1
            }
        };
        let g = &mut groups[idx].1;
        match r.violations() {
            None => g.skip += 1,
            Some([]) => g.pass += 1,
            Some(violations) => {
                g.fail += 1;
                g.failed.extend(violations.iter().map(|v| v.kind.name()));
            }
        }
    }
    groups.sort_by(|((la, pa), _), ((lb, pb), _)| la.total_cmp(lb).then(pa.cmp(pb)));

    let header = format!(
        "{:<12} | {:<5} | {:>4} | {:>4} | {:>4} | {:>4} | Failed Invariants",
        "Util Level", "Sched", "Runs", "Pass", "Fail", "Skip"
    );
    let rule = "=".repeat(header.len());
    let _ = writeln!(out, "{rule}\n{header}\n{}", "-".repeat(header.len()));
    for ((level, policy), g) in &groups {
        let failed: Vec<&str> = g.failed.iter().copied().collect();
        let _ = writeln!(
            out,
            "{:<12} | {:<5} | {:>4} | {:>4} | {:>4} | {:>4} | {}",
            util_label(*level),
            policy.name(),
            g.pass + g.fail + g.skip,
            g.pass,
            g.fail,
            g.skip,
            failed.join(", ")
        );
    }
    let _ = writeln!(out, "{rule}");

    let mut by_kind: BTreeMap<InvariantKind, Vec<(&RunResult, &Violation)>> = BTreeMap::new();
    for r in results {
        for v in r.violations().unwrap_or_default() {
            by_kind.entry(v.kind).or_default().push((r, v));
        }
    }
    if !by_kind.is_empty() {
        let _ = writeln!(out, "\nFAILURE DETAILS (first {max_details} per invariant):");
        let _ = writeln!(out, "{}", "-".repeat(80));
        for (kind, details) in &by_kind {
            let _ = writeln!(
                out,
                "\n  {} ({} total failures):",
                kind.label(),
                details.len()
            );
            for (r, v) in details.iter().take(max_details) {
                let _ = writeln!(out, "    [{}] {}", r.label(), violation_line(v));
            }
            if details.len() > max_details {
                let _ = writeln!(out, "    ... and {} more", details.len() - max_details);
            }
        }
    }

    if all_passed(results) {
        let _ = writeln!(out, "\nAll generated scenario invariants PASSED.");
    } else {
        let _ = writeln!(out, "\nSome generated scenario invariants FAILED. See details above.");
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
