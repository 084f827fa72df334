/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The invariant checks.
//!
//! Each check is a free function that reads the [`StateTracker`] at the
//! moment the dispatcher calls it and reports what it found.  None of them
//! mutate state; the order in which they run relative to the tracker
//! mutations is decided entirely by the dispatcher.

use super::math::{
    approx_eq, csf_active_cores, raw_frequency, ABS_TOL, MIN_VT_INTERVAL, VT_DEADLINE_TOL,
};
use super::tracker::{ServerState, StateTracker};
use super::violation::{InvariantKind, Violation};
use crate::platform::{ClusterId, ClusterInfo};
use crate::scenario::TaskId;

// ── Per-server checks ─────────────────────────────────────────────────────────

/// A job must finish no later than its server's deadline.
pub fn no_deadline_miss(tracker: &StateTracker, time: f64, tid: TaskId) -> Option<Violation> {
    let server = tracker.server(tid)?;
    if time <= server.deadline + ABS_TOL {
        return None;
    }
    Some(Violation::new(
        InvariantKind::NoDeadlineMiss,
        time,
        Some(tid),
        format!(
            "job finished at t={time:.6} after deadline={:.6} (late by {:.6})",
            server.deadline,
            time - server.deadline
        ),
    ))
}

/// A reported virtual time must not exceed the server deadline.
pub fn vt_le_deadline(
    tracker: &StateTracker,
    time: f64,
    tid: TaskId,
    virtual_time: f64,
) -> Option<Violation> {
    let server = tracker.server(tid)?;
    if virtual_time <= server.deadline + VT_DEADLINE_TOL {
        return None;
    }
    Some(Violation::new(
        InvariantKind::VtLeDeadline,
        time,
        Some(tid),
        format!(
            "virtual_time={virtual_time:.6} exceeds deadline={:.6}",
            server.deadline
        ),
    ))
}

/// The scheduled server must have the earliest deadline among the attached
/// Ready servers of its cluster.  Deadlines within tolerance are ties.
pub fn edf_ordering(tracker: &StateTracker, time: f64, tid: TaskId) -> Vec<Violation> {
    let (Some(running), Some(c)) = (tracker.server(tid), tracker.cluster_of(tid)) else {
        return Vec::new();
    };
    tracker
        .servers_in_cluster(c)
        .filter(|other| other.tid != tid)
        .filter(|other| other.state == ServerState::Ready)
        .filter(|other| other.deadline < running.deadline - ABS_TOL)
        .map(|other| {
            Violation::new(
                InvariantKind::EdfOrdering,
                time,
                Some(tid),
                format!(
                    "scheduled deadline={:.6} but tid={} is Ready with earlier deadline={:.6}",
                    running.deadline, other.tid, other.deadline
                ),
            )
        })
        .collect()
}

/// A replenished budget must equal
/// `max(0, scaled_u / bandwidth * (deadline - virtual_time))`.
pub fn budget_formula(
    tracker: &StateTracker,
    time: f64,
    tid: TaskId,
    budget: f64,
) -> Option<Violation> {
    let server = tracker.server(tid)?;
    let c = tracker.cluster_of(tid)?;
    let bandwidth = tracker.compute_bandwidth(c);
    if bandwidth <= 0.0 {
        return None;
    }
    let scaled_u = tracker.scaled_utilization(tid);
    let expected = (scaled_u / bandwidth * (server.deadline - server.virtual_time)).max(0.0);
    if approx_eq(budget, expected) {
        return None;
    }
    Some(Violation::new(
        InvariantKind::BudgetFormula,
        time,
        Some(tid),
        format!(
            "budget={budget:.6} expected={expected:.6} \
             (scaled_u={scaled_u:.4} bw={bandwidth:.4} deadline={:.6} vt={:.6})",
            server.deadline, server.virtual_time
        ),
    ))
}

/// Numbers behind a failed VT-rate check, kept so the dispatcher can print
/// a diagnostic dump alongside the violation.
#[derive(Debug, Clone, PartialEq)]
pub struct VtRateMismatch {
    pub tid: TaskId,
    pub cluster: ClusterId,
    pub delta_wall: f64,
    pub delta_vt: f64,
    pub expected: f64,
    pub bandwidth: f64,
    pub scaled_u: f64,
}

impl VtRateMismatch {
    pub fn to_violation(&self, time: f64) -> Violation {
        Violation::new(
            InvariantKind::VtRate,
            time,
            Some(self.tid),
            format!(
                "delta_vt={:.6} expected={:.6} over delta_wall={:.6} (bw={:.4} scaled_u={:.4})",
                self.delta_vt, self.expected, self.delta_wall, self.bandwidth, self.scaled_u
            ),
        )
    }
}

/// Virtual time must advance at `bandwidth / scaled_u` over a continuously
/// running interval.  Must run before the tracker records `virtual_time`.
///
/// Skipped when there is no comparable baseline: the server was interrupted,
/// has no previous sample, saw a membership change, or the interval is
/// negligibly short.
pub fn vt_rate(
    tracker: &StateTracker,
    time: f64,
    tid: TaskId,
    virtual_time: f64,
) -> Option<VtRateMismatch> {
    let server = tracker.server(tid)?;
    let c = tracker.cluster_of(tid)?;
    if !server.ran_continuously || server.bandwidth_may_have_changed {
        return None;
    }
    let baseline = server.cur_vt?;
    let delta_wall = time - baseline.time;
    if delta_wall <= MIN_VT_INTERVAL {
        return None;
    }
    let bandwidth = tracker.compute_bandwidth(c);
    let scaled_u = tracker.scaled_utilization(tid);
    if bandwidth <= 0.0 || scaled_u <= 0.0 {
        return None;
    }

    let delta_vt = virtual_time - baseline.value;
    let expected = bandwidth / scaled_u * delta_wall;
    if approx_eq(delta_vt, expected) {
        return None;
    }
    Some(VtRateMismatch {
        tid,
        cluster: c,
        delta_wall,
        delta_vt,
        expected,
        bandwidth,
        scaled_u,
    })
}

// ── Frequency checks ──────────────────────────────────────────────────────────

/// Apply the effective-frequency floor shared by FFA and CSF.
fn with_floor(cluster: &ClusterInfo, freq_min: f64) -> f64 {
    let floor = cluster.effective_freq;
    if floor > 0.0 && freq_min < floor {
        cluster.ceil_to_mode(floor)
    } else {
        cluster.ceil_to_mode(freq_min)
    }
}

fn frequency_violation(
    kind: InvariantKind,
    time: f64,
    c: ClusterId,
    freq: f64,
    expected: f64,
    raw: f64,
    inputs: String,
) -> Option<Violation> {
    if approx_eq(freq, expected) {
        return None;
    }
    Some(Violation::new(
        kind,
        time,
        None,
        format!("cluster={c} freq={freq:.1} expected={expected:.1} raw={raw:.4} ({inputs})"),
    ))
}

/// Power-aware selection: utilization of every attached server plus the
/// cluster's never-decremented watermark.
pub fn power_aware_frequency(
    tracker: &StateTracker,
    time: f64,
    c: ClusterId,
) -> Option<Violation> {
    let cluster = tracker.platform().cluster(c)?;
    let freq = tracker.cluster_frequency(c)?;
    let attached: Vec<f64> = tracker
        .servers_in_cluster(c)
        .map(|s| cluster.scale_utilization(s.utilization))
        .collect();
    if attached.is_empty() {
        return None;
    }
    let total_u: f64 = attached.iter().sum();
    let u_max = tracker.max_ever_scheduler_util(c);
    let m = cluster.num_procs;

    let raw = raw_frequency(cluster.freq_max, total_u, u_max, m);
    let expected = cluster.ceil_to_mode(raw.min(cluster.freq_max));
    frequency_violation(
        InvariantKind::PowerAwareFrequency,
        time,
        c,
        freq,
        expected,
        raw,
        format!("total_u={total_u:.4} u_max={u_max:.4} m={m}"),
    )
}

/// Utilization inputs shared by FFA and CSF: the Ready/Running sum and the
/// maximum over every server ever placed on the cluster.
fn active_inputs(tracker: &StateTracker, cluster: &ClusterInfo) -> Option<(f64, f64)> {
    let active: Vec<f64> = tracker
        .active_servers_in_cluster(cluster.id)
        .map(|s| cluster.scale_utilization(s.utilization))
        .collect();
    if active.is_empty() {
        return None;
    }
    let active_u = active.iter().sum();
    let u_max = tracker
        .all_servers_in_cluster(cluster.id)
        .map(|s| cluster.scale_utilization(s.utilization))
        .fold(0.0, f64::max);
    Some((active_u, u_max))
}

/// FFA selection with the effective-frequency floor.
pub fn ffa_frequency(tracker: &StateTracker, time: f64, c: ClusterId) -> Option<Violation> {
    let cluster = tracker.platform().cluster(c)?;
    let freq = tracker.cluster_frequency(c)?;
    let (active_u, u_max) = active_inputs(tracker, cluster)?;
    let m = cluster.num_procs;

    let raw = raw_frequency(cluster.freq_max, active_u, u_max, m);
    let expected = with_floor(cluster, raw.min(cluster.freq_max));
    frequency_violation(
        InvariantKind::FfaFrequency,
        time,
        c,
        freq,
        expected,
        raw,
        format!("active_u={active_u:.4} u_max={u_max:.4} m={m}"),
    )
}

/// CSF selection: FFA on a reduced number of active cores.
pub fn csf_frequency(tracker: &StateTracker, time: f64, c: ClusterId) -> Option<Violation> {
    let cluster = tracker.platform().cluster(c)?;
    let freq = tracker.cluster_frequency(c)?;
    let (active_u, u_max) = active_inputs(tracker, cluster)?;
    let m_min = csf_active_cores(active_u, u_max, cluster.num_procs);

    let raw = raw_frequency(cluster.freq_max, active_u, u_max, m_min);
    let expected = with_floor(cluster, raw.min(cluster.freq_max));
    frequency_violation(
        InvariantKind::CsfFrequency,
        time,
        c,
        freq,
        expected,
        raw,
        format!("active_u={active_u:.4} u_max={u_max:.4} m_min={m_min}"),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
