/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Trace checker: replays one trace through a fresh [`StateTracker`] and
//! collects every invariant violation.
//!
//! # Check ordering
//!
//! Within each same-timestamp batch, events are dispatched in stream order.
//! Several checks are defined on "the state just before this event changes
//! it", so every event kind has a fixed check/mutate sequence:
//!
//! | Event                     | Sequence                                        |
//! |---------------------------|-------------------------------------------------|
//! | `job_finished`            | deadline check → mutate                         |
//! | `virtual_time_update`     | VT-rate check → mutate → VT ≤ deadline → post   |
//! | `serv_budget_replenished` | budget check → mutate                           |
//! | `frequency_update`        | mutate → frequency check of the policy          |
//! | `task_scheduled`          | mutate → EDF ordering check                     |
//! | anything else             | mutate                                          |
//!
//! Violations are data: a trace is always processed to the end.

pub mod invariants;
pub mod math;
pub mod tracker;
pub mod violation;

use std::fmt::Write as _;

use tracing::debug;

pub use tracker::StateTracker;
pub use violation::{InvariantKind, Violation};

use crate::platform::Platform;
use crate::policy::Policy;
use crate::scenario::TaskInfo;
use crate::trace::{batches, Event, TraceEntry};
use invariants::VtRateMismatch;

/// Outcome of checking one trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceReport {
    /// Violations in the order they were found.
    pub violations: Vec<Violation>,
    /// Diagnostic dumps, one per VT-rate violation, when requested.
    pub diagnostics: Vec<String>,
}

impl TraceReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations of one invariant kind.
    pub fn of_kind(&self, kind: InvariantKind) -> impl Iterator<Item = &Violation> + '_ {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

/// Check `trace` for a run of `policy` on `platform` with the declared
/// `tasks`.
///
/// The checker holds no state across calls: the same inputs always produce
/// the same report.  With `dump_violations`, each VT-rate violation also
/// produces a diagnostic dump of the recent event history.
pub fn verify_trace(
    trace: &[TraceEntry],
    platform: &Platform,
    tasks: &[TaskInfo],
    policy: Policy,
    dump_violations: bool,
) -> TraceReport {
    let mut tracker = StateTracker::new(platform, tasks, dump_violations);
    tracker.supplement_arrivals(trace);

    let mut report = TraceReport::default();
    for batch in batches(trace) {
        for entry in batch {
            dispatch(&mut tracker, entry, policy, dump_violations, &mut report);
        }
    }

    debug!(
        policy = %policy,
        events = trace.len(),
        violations = report.violations.len(),
        "Trace checked"
    );
    report
}

fn dispatch(
    tracker: &mut StateTracker,
    entry: &TraceEntry,
    policy: Policy,
    dump_violations: bool,
    report: &mut TraceReport,
) {
    tracker.record(entry);
    let time = entry.time;

    match entry.event {
        Event::JobFinished { tid } => {
            report
                .violations
                .extend(invariants::no_deadline_miss(tracker, time, tid));
            tracker.apply(time, &entry.event);
        }
        Event::VirtualTimeUpdate {
            tid, virtual_time, ..
        } => {
            if let Some(mismatch) = invariants::vt_rate(tracker, time, tid, virtual_time) {
                report.violations.push(mismatch.to_violation(time));
                if dump_violations {
                    report.diagnostics.push(vt_rate_dump(tracker, time, &mismatch));
                }
            }
            tracker.apply(time, &entry.event);
            report
                .violations
                .extend(invariants::vt_le_deadline(tracker, time, tid, virtual_time));
            tracker.post_virtual_time_update(tid);
        }
        Event::ServBudgetReplenished { tid, budget } => {
            report
                .violations
                .extend(invariants::budget_formula(tracker, time, tid, budget));
            tracker.apply(time, &entry.event);
        }
        Event::FrequencyUpdate { cluster_id, .. } => {
            tracker.apply(time, &entry.event);
            let violation = match policy {
                Policy::Grub => None,
                Policy::Pa => invariants::power_aware_frequency(tracker, time, cluster_id),
                Policy::Ffa => invariants::ffa_frequency(tracker, time, cluster_id),
                Policy::Csf => invariants::csf_frequency(tracker, time, cluster_id),
            };
            report.violations.extend(violation);
        }
        Event::TaskScheduled { tid, .. } => {
            tracker.apply(time, &entry.event);
            report
                .violations
                .extend(invariants::edf_ordering(tracker, time, tid));
        }
        _ => tracker.apply(time, &entry.event),
    }
}

/// Render the state behind a VT-rate violation: the computed numbers, the
/// attached servers of the cluster, and the recent event history.  Events
/// that carry the simulator's own bandwidth are marked when it disagrees
/// with the recomputed one.
fn vt_rate_dump(tracker: &StateTracker, time: f64, mismatch: &VtRateMismatch) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== vt_rate violation t={time:.6} tid={} cluster={} ===",
        mismatch.tid, mismatch.cluster
    );
    let _ = writeln!(
        out,
        "  delta_wall={:.6} delta_vt={:.6} expected={:.6} bw={:.6} scaled_u={:.6}",
        mismatch.delta_wall,
        mismatch.delta_vt,
        mismatch.expected,
        mismatch.bandwidth,
        mismatch.scaled_u
    );
    if let Some(s) = tracker.server(mismatch.tid) {
        let _ = writeln!(
            out,
            "  server: state={:?} deadline={:.6} vt={:.6} prev_vt={:?} cur_vt={:?} \
             in_scheduler={} ran_continuously={} bw_may_changed={}",
            s.state,
            s.deadline,
            s.virtual_time,
            s.prev_vt,
            s.cur_vt,
            s.in_scheduler,
            s.ran_continuously,
            s.bandwidth_may_have_changed
        );
    }
    let _ = writeln!(out, "  attached servers:");
    for s in tracker.servers_in_cluster(mismatch.cluster) {
        let _ = writeln!(
            out,
            "    tid={} u={:.4} scaled_u={:.4} state={:?}",
            s.tid,
            s.utilization,
            tracker.scaled_utilization(s.tid),
            s.state
        );
    }
    let _ = writeln!(out, "  recent events:");
    for e in tracker.recent_events() {
        let _ = write!(out, "    t={:.6} {}", e.time, e.event.kind());
        if let Event::VirtualTimeUpdate {
            tid,
            virtual_time,
            bandwidth,
        } = e.event
        {
            let _ = write!(out, " tid={tid} vt={virtual_time:.6}");
            if let Some(bw) = bandwidth {
                let marker = if math::approx_eq(bw, mismatch.bandwidth) {
                    ""
                } else {
                    "  <-- bandwidth mismatch"
                };
                let _ = write!(out, " trace_bw={bw:.6}{marker}");
            }
        }
        let _ = writeln!(out);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::TaskId;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn single_cluster(m: usize, freqs: Vec<f64>) -> Platform {
        Platform::from_clusters(vec![(m, freqs, 0.0, 1.0)]).unwrap()
    }

    fn at(time: f64, event: Event) -> TraceEntry {
        TraceEntry::new(time, event)
    }

    /// Reference cluster 0 (one core, 1000) and a big cluster 1 (two cores,
    /// up to 2000, twice the per-cycle throughput): scale_speed 0.5 and
    /// perf_score 2, so a nominal 0.8 scales to 0.2 there.
    fn two_clusters() -> Platform {
        Platform::from_clusters(vec![
            (1, vec![1000.0], 0.0, 1.0),
            (2, vec![500.0, 1000.0, 1500.0, 2000.0], 0.0, 2.0),
        ])
        .unwrap()
    }

    /// Arrival, placement and attach of one server at `time`.
    fn start(time: f64, tid: TaskId, u: f64, deadline: f64) -> Vec<TraceEntry> {
        start_on(0, time, tid, u, deadline)
    }

    fn start_on(cluster_id: usize, time: f64, tid: TaskId, u: f64, deadline: f64) -> Vec<TraceEntry> {
        vec![
            at(time, Event::JobArrival { tid }),
            at(time, Event::TaskPlaced { tid, cluster_id }),
            at(
                time,
                Event::ServReady {
                    tid,
                    deadline,
                    utilization: u,
                },
            ),
        ]
    }

    fn vt(time: f64, tid: TaskId, virtual_time: f64) -> TraceEntry {
        at(
            time,
            Event::VirtualTimeUpdate {
                tid,
                virtual_time,
                bandwidth: None,
            },
        )
    }

    /// One server that runs from `t0` and finishes at `t0 + 5`.
    fn single_server_run(t0: f64, tid: TaskId) -> Vec<TraceEntry> {
        let mut trace = start(t0, tid, 0.5, t0 + 10.0);
        trace.extend([
            at(t0, Event::ServRunning { tid }),
            at(t0, Event::TaskScheduled { tid, cpu: 0 }),
            vt(t0, tid, t0),
            vt(t0 + 2.0, tid, t0 + 2.0),
            at(t0 + 5.0, Event::JobFinished { tid }),
            vt(t0 + 5.0, tid, t0 + 5.0),
            at(t0 + 5.0, Event::ServInactive { tid }),
            at(t0 + 5.0, Event::ProcIdled { cpu: 0 }),
        ]);
        trace
    }

    // ── Bandwidth ─────────────────────────────────────────────────────────────

    #[test]
    fn cluster_without_servers_has_unit_bandwidth() {
        let p = single_cluster(4, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 10.0, vec![0.0])];
        let mut tracker = StateTracker::new(&p, &tasks, false);
        let trace = vec![
            at(0.0, Event::JobArrival { tid: 1 }),
            at(0.0, Event::Resched),
        ];
        for e in &trace {
            tracker.apply(e.time, &e.event);
        }
        assert_eq!(tracker.compute_bandwidth(0), 1.0);
    }

    // ── No deadline miss ──────────────────────────────────────────────────────

    #[test]
    fn late_completion_is_exactly_one_violation() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 10.0, vec![0.0])];
        let mut trace = start(0.0, 1, 0.5, 10.0);
        trace.push(at(10.001, Event::JobFinished { tid: 1 }));

        let report = verify_trace(&trace, &p, &tasks, Policy::Grub, false);
        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.kind, InvariantKind::NoDeadlineMiss);
        assert_eq!(v.time, 10.001);
        assert_eq!(v.tid, Some(1));
    }

    #[test]
    fn on_time_run_passes_every_invariant() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 10.0, vec![0.0])];
        let report = verify_trace(&single_server_run(0.0, 1), &p, &tasks, Policy::Grub, false);
        assert!(report.passed(), "{:?}", report.violations);
    }

    // ── Isolation and determinism ─────────────────────────────────────────────

    #[test]
    fn disjoint_runs_do_not_contaminate_each_other() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![
            TaskInfo::new(1, 0.5, 10.0, vec![0.0]),
            TaskInfo::new(2, 0.5, 10.0, vec![100.0]),
        ];
        let mut first = single_server_run(0.0, 1);
        first.push(at(11.0, Event::JobFinished { tid: 1 }));
        let mut second = single_server_run(100.0, 2);
        second.insert(6, vt(101.0, 2, 100.5));

        let a = verify_trace(&first, &p, &tasks, Policy::Grub, false);
        let b = verify_trace(&second, &p, &tasks, Policy::Grub, false);
        assert!(!a.passed());
        assert!(!b.passed());

        let concatenated: Vec<TraceEntry> = first.iter().chain(second.iter()).cloned().collect();
        let both = verify_trace(&concatenated, &p, &tasks, Policy::Grub, false);

        let mut expected = a.violations.clone();
        expected.extend(b.violations.clone());
        assert_eq!(both.violations, expected);
    }

    #[test]
    fn checking_twice_yields_identical_reports() {
        let p = single_cluster(2, vec![500.0, 1000.0, 1500.0, 2000.0]);
        let tasks = vec![
            TaskInfo::new(1, 0.4, 10.0, vec![0.0]),
            TaskInfo::new(2, 0.3, 10.0, vec![0.0]),
        ];
        let mut trace = start(0.0, 1, 0.4, 10.0);
        trace.extend(start(0.0, 2, 0.3, 5.0));
        trace.extend([
            at(0.0, Event::TaskScheduled { tid: 1, cpu: 0 }),
            at(0.0, Event::FrequencyUpdate {
                cluster_id: 0,
                frequency: 500.0,
            }),
            at(11.0, Event::JobFinished { tid: 1 }),
        ]);

        let first = verify_trace(&trace, &p, &tasks, Policy::Pa, true);
        let second = verify_trace(&trace, &p, &tasks, Policy::Pa, true);
        assert!(!first.passed());
        assert_eq!(first, second);
        let render = |r: &TraceReport| {
            r.violations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(render(&first), render(&second));
    }

    // ── VT rate ───────────────────────────────────────────────────────────────

    /// A server running continuously from t=0 with its VT reported at 0 and
    /// again at `t1`.
    fn vt_rate_trace(servers: &[(TaskId, f64)], t1: f64, vt1: f64) -> Vec<TraceEntry> {
        let mut trace = Vec::new();
        for &(tid, u) in servers {
            trace.extend(start(0.0, tid, u, 100.0));
        }
        trace.extend([
            at(0.0, Event::ServRunning { tid: 1 }),
            at(0.0, Event::TaskScheduled { tid: 1, cpu: 0 }),
            vt(0.0, 1, 0.0),
            vt(t1, 1, vt1),
        ]);
        trace
    }

    #[test]
    fn vt_rate_single_server_tracks_wall_time() {
        // bandwidth = scaled_u = 0.5: Δvt = Δwall.
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 100.0, vec![0.0])];

        let ok = verify_trace(&vt_rate_trace(&[(1, 0.5)], 2.0, 2.0), &p, &tasks, Policy::Grub, false);
        assert!(ok.passed(), "{:?}", ok.violations);

        let bad = verify_trace(&vt_rate_trace(&[(1, 0.5)], 2.0, 1.9), &p, &tasks, Policy::Grub, false);
        assert_eq!(bad.violations.len(), 1);
        assert!(bad.violations[0].message.contains("vt_rate"));
    }

    #[test]
    fn vt_rate_scales_with_bandwidth_over_utilization() {
        // m=1, two servers of 0.25: bandwidth = 0.5, Δvt = Δwall / 0.5.
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![
            TaskInfo::new(1, 0.25, 100.0, vec![0.0]),
            TaskInfo::new(2, 0.25, 100.0, vec![0.0]),
        ];
        let servers = [(1, 0.25), (2, 0.25)];

        let ok = verify_trace(&vt_rate_trace(&servers, 2.0, 4.0), &p, &tasks, Policy::Grub, false);
        assert!(ok.passed(), "{:?}", ok.violations);

        let bad = verify_trace(&vt_rate_trace(&servers, 2.0, 3.9), &p, &tasks, Policy::Grub, false);
        assert_eq!(bad.violations.len(), 1);
        assert_eq!(bad.violations[0].kind, InvariantKind::VtRate);
        assert!(bad.violations[0].message.contains("vt_rate"));
    }

    #[test]
    fn vt_rate_skips_after_membership_change() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![
            TaskInfo::new(1, 0.25, 100.0, vec![0.0]),
            TaskInfo::new(2, 0.25, 100.0, vec![0.0]),
        ];
        let mut trace = start(0.0, 1, 0.25, 100.0);
        trace.extend([
            at(0.0, Event::ServRunning { tid: 1 }),
            vt(0.0, 1, 0.0),
        ]);
        // Server 2 attaches mid-interval: the old baseline is unusable.
        trace.extend(start(1.0, 2, 0.25, 100.0));
        trace.push(vt(2.0, 1, 123.0));

        let report = verify_trace(&trace, &p, &tasks, Policy::Grub, false);
        assert_eq!(report.of_kind(InvariantKind::VtRate).count(), 0);
    }

    #[test]
    fn vt_rate_dump_is_produced_on_request() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 100.0, vec![0.0])];
        let mut trace = vt_rate_trace(&[(1, 0.5)], 2.0, 1.9);
        if let Some(last) = trace.last_mut() {
            last.event = Event::VirtualTimeUpdate {
                tid: 1,
                virtual_time: 1.9,
                bandwidth: Some(0.7),
            };
        }

        let quiet = verify_trace(&trace, &p, &tasks, Policy::Grub, false);
        assert!(quiet.diagnostics.is_empty());

        let dumped = verify_trace(&trace, &p, &tasks, Policy::Grub, true);
        assert_eq!(dumped.diagnostics.len(), 1);
        let dump = &dumped.diagnostics[0];
        assert!(dump.contains("vt_rate violation"));
        assert!(dump.contains("bandwidth mismatch"));
        assert!(dump.contains("serv_ready"));
        assert!(dump.contains("in_scheduler=true ran_continuously=true bw_may_changed=false"));
    }

    // ── VT ≤ deadline and budget ──────────────────────────────────────────────

    #[test]
    fn vt_beyond_deadline_checked_after_update() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 10.0, vec![0.0])];
        let mut trace = start(0.0, 1, 0.5, 10.0);
        trace.push(vt(0.0, 1, 10.5));

        let report = verify_trace(&trace, &p, &tasks, Policy::Grub, false);
        assert_eq!(report.of_kind(InvariantKind::VtLeDeadline).count(), 1);
    }

    #[test]
    fn budget_checked_against_state_before_replenish() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 10.0, vec![0.0])];
        let mut trace = start(0.0, 1, 0.5, 10.0);
        trace.push(at(0.0, Event::ServBudgetReplenished { tid: 1, budget: 10.0 }));
        assert!(verify_trace(&trace, &p, &tasks, Policy::Grub, false).passed());

        trace.push(at(0.0, Event::ServBudgetReplenished { tid: 1, budget: 4.0 }));
        let report = verify_trace(&trace, &p, &tasks, Policy::Grub, false);
        assert_eq!(report.of_kind(InvariantKind::BudgetFormula).count(), 1);
    }

    // ── EDF ───────────────────────────────────────────────────────────────────

    #[test]
    fn scheduling_later_deadline_violates_edf() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![
            TaskInfo::new(1, 0.2, 10.0, vec![0.0]),
            TaskInfo::new(2, 0.2, 10.0, vec![0.0]),
        ];
        let mut trace = start(0.0, 1, 0.2, 10.0);
        trace.extend(start(0.0, 2, 0.2, 5.0));
        trace.push(at(0.0, Event::TaskScheduled { tid: 1, cpu: 0 }));

        let report = verify_trace(&trace, &p, &tasks, Policy::Grub, false);
        let edf: Vec<_> = report.of_kind(InvariantKind::EdfOrdering).collect();
        assert_eq!(edf.len(), 1);
        assert_eq!(edf[0].tid, Some(1));
    }

    // ── Frequency ─────────────────────────────────────────────────────────────

    fn pa_trace(frequency: f64) -> Vec<TraceEntry> {
        let mut trace = start(0.0, 1, 0.4, 10.0);
        trace.extend(start(0.0, 2, 0.1, 10.0));
        trace.extend(start(0.0, 3, 0.1, 10.0));
        trace.push(at(
            0.0,
            Event::FrequencyUpdate {
                cluster_id: 0,
                frequency,
            },
        ));
        trace
    }

    #[test]
    fn power_aware_frequency_reports_raw_value() {
        let p = single_cluster(2, vec![500.0, 1000.0, 1500.0, 2000.0]);
        let tasks = vec![
            TaskInfo::new(1, 0.4, 10.0, vec![0.0]),
            TaskInfo::new(2, 0.1, 10.0, vec![0.0]),
            TaskInfo::new(3, 0.1, 10.0, vec![0.0]),
        ];

        assert!(verify_trace(&pa_trace(1000.0), &p, &tasks, Policy::Pa, false).passed());

        let report = verify_trace(&pa_trace(1500.0), &p, &tasks, Policy::Pa, false);
        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.kind, InvariantKind::PowerAwareFrequency);
        assert!(v.message.contains("raw=1000.0000"), "{}", v.message);
    }

    #[test]
    fn frequency_checked_only_for_matching_policy() {
        let p = single_cluster(2, vec![500.0, 1000.0, 1500.0, 2000.0]);
        let tasks = vec![
            TaskInfo::new(1, 0.4, 10.0, vec![0.0]),
            TaskInfo::new(2, 0.1, 10.0, vec![0.0]),
            TaskInfo::new(3, 0.1, 10.0, vec![0.0]),
        ];
        assert!(verify_trace(&pa_trace(1500.0), &p, &tasks, Policy::Grub, false).passed());
    }

    #[test]
    fn power_aware_watermark_survives_detach() {
        // Server 1 (0.8) detaches; the watermark stays at 0.8 so with only
        // server 2 (0.2) attached: raw = 2000 * (0.2 + 0.8) / 2 = 1000.
        let p = single_cluster(2, vec![500.0, 1000.0, 1500.0, 2000.0]);
        let tasks = vec![
            TaskInfo::new(1, 0.8, 10.0, vec![0.0]),
            TaskInfo::new(2, 0.2, 10.0, vec![0.0]),
        ];
        let mut trace = start(0.0, 1, 0.8, 10.0);
        trace.extend(start(0.0, 2, 0.2, 10.0));
        trace.extend([
            at(4.0, Event::ServInactive { tid: 1 }),
            at(
                4.0,
                Event::FrequencyUpdate {
                    cluster_id: 0,
                    frequency: 1000.0,
                },
            ),
        ]);
        assert!(verify_trace(&trace, &p, &tasks, Policy::Pa, false).passed());

        // Without the watermark, the expected frequency would be 500.
        if let Some(last) = trace.last_mut() {
            last.event = Event::FrequencyUpdate {
                cluster_id: 0,
                frequency: 500.0,
            };
        }
        let report = verify_trace(&trace, &p, &tasks, Policy::Pa, false);
        assert_eq!(report.of_kind(InvariantKind::PowerAwareFrequency).count(), 1);
    }

    #[test]
    fn ffa_and_csf_frequency_checked_per_policy() {
        // Single server 0.3 on one core: raw = 600 → 1000 for both.
        let p = single_cluster(1, vec![500.0, 1000.0, 2000.0]);
        let tasks = vec![TaskInfo::new(1, 0.3, 10.0, vec![0.0])];
        let mut trace = start(0.0, 1, 0.3, 10.0);
        trace.push(at(
            0.0,
            Event::FrequencyUpdate {
                cluster_id: 0,
                frequency: 2000.0,
            },
        ));
        for (policy, kind) in [
            (Policy::Ffa, InvariantKind::FfaFrequency),
            (Policy::Csf, InvariantKind::CsfFrequency),
        ] {
            let report = verify_trace(&trace, &p, &tasks, policy, false);
            assert_eq!(report.violations.len(), 1);
            assert_eq!(report.violations[0].kind, kind);
        }
    }

    // ── Server lifecycle ──────────────────────────────────────────────────────

    /// One server of 0.5 on one core, deadline 10, optionally postponed to
    /// 20 at t=5, replenished with 20 and finishing at t=15.
    fn postpone_trace(postpone: bool) -> Vec<TraceEntry> {
        let mut trace = start(0.0, 1, 0.5, 10.0);
        if postpone {
            trace.push(at(5.0, Event::ServPostpone { tid: 1, deadline: 20.0 }));
        }
        trace.extend([
            at(5.0, Event::ServBudgetReplenished { tid: 1, budget: 20.0 }),
            at(15.0, Event::JobFinished { tid: 1 }),
        ]);
        trace
    }

    #[test]
    fn postpone_moves_the_server_deadline() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 10.0, vec![0.0])];

        let postponed = verify_trace(&postpone_trace(true), &p, &tasks, Policy::Grub, false);
        assert!(postponed.passed(), "{:?}", postponed.violations);

        let kept = verify_trace(&postpone_trace(false), &p, &tasks, Policy::Grub, false);
        assert_eq!(kept.of_kind(InvariantKind::BudgetFormula).count(), 1);
        assert_eq!(kept.of_kind(InvariantKind::NoDeadlineMiss).count(), 1);
    }

    #[test]
    fn placement_events_rehome_an_attached_server() {
        // Task 1 (0.8) starts alone on cluster 0: bandwidth 0.8, budget 100.
        // On cluster 1 it scales to 0.2 next to task 2 (also 0.2):
        // bandwidth (0.2 + 0.4) / 2 = 0.3, budget 0.2 / 0.3 * 100.
        let p = two_clusters();
        let tasks = vec![
            TaskInfo::new(1, 0.8, 100.0, vec![0.0]),
            TaskInfo::new(2, 0.8, 100.0, vec![0.0]),
        ];
        let rehome_events = [
            Event::MigrationCluster { tid: 1, cluster_id: 1 },
            Event::TaskPlaced { tid: 1, cluster_id: 1 },
        ];
        for rehome in rehome_events {
            let trace = |budget: f64| {
                let mut trace = start_on(0, 0.0, 1, 0.8, 100.0);
                trace.extend(start_on(1, 0.0, 2, 0.8, 100.0));
                trace.extend([
                    at(0.0, Event::ServBudgetReplenished { tid: 1, budget: 100.0 }),
                    at(1.0, rehome.clone()),
                    at(1.0, Event::ServBudgetReplenished { tid: 1, budget }),
                ]);
                trace
            };

            let moved = verify_trace(&trace(200.0 / 3.0), &p, &tasks, Policy::Grub, false);
            assert!(moved.passed(), "{}: {:?}", rehome.kind(), moved.violations);

            let stale = verify_trace(&trace(100.0), &p, &tasks, Policy::Grub, false);
            let budget: Vec<_> = stale.of_kind(InvariantKind::BudgetFormula).collect();
            assert_eq!(budget.len(), 1, "{}", rehome.kind());
            assert_eq!(budget[0].time, 1.0);
            assert!(budget[0].message.contains("scaled_u=0.2000"), "{}", budget[0].message);
        }
    }

    #[test]
    fn non_continuing_server_has_no_vt_rate_baseline() {
        let p = single_cluster(1, vec![1000.0]);
        let tasks = vec![TaskInfo::new(1, 0.5, 100.0, vec![0.0])];
        let trace = |non_cont: bool| {
            let mut trace = vt_rate_trace(&[(1, 0.5)], 2.0, 1.0);
            if non_cont {
                trace.insert(trace.len() - 1, at(1.0, Event::ServNonCont { tid: 1 }));
            }
            trace
        };

        let interrupted = verify_trace(&trace(true), &p, &tasks, Policy::Grub, false);
        assert_eq!(interrupted.of_kind(InvariantKind::VtRate).count(), 0);

        let continuous = verify_trace(&trace(false), &p, &tasks, Policy::Grub, false);
        assert_eq!(continuous.of_kind(InvariantKind::VtRate).count(), 1);
    }

    #[test]
    fn non_positive_bandwidth_skips_budget_and_vt_rate() {
        // A zero-utilization server leaves the cluster bandwidth at 0.
        let p = single_cluster(1, vec![1000.0]);
        let trace = |u: f64| {
            let mut trace = vt_rate_trace(&[(1, u)], 2.0, 5.0);
            trace.insert(3, at(0.0, Event::ServBudgetReplenished { tid: 1, budget: 7.0 }));
            trace
        };

        let idle_tasks = vec![TaskInfo::new(1, 0.0, 100.0, vec![0.0])];
        let idle = verify_trace(&trace(0.0), &p, &idle_tasks, Policy::Grub, false);
        assert!(idle.passed(), "{:?}", idle.violations);

        let busy_tasks = vec![TaskInfo::new(1, 0.5, 100.0, vec![0.0])];
        let busy = verify_trace(&trace(0.5), &p, &busy_tasks, Policy::Grub, false);
        assert_eq!(busy.of_kind(InvariantKind::BudgetFormula).count(), 1);
        assert_eq!(busy.of_kind(InvariantKind::VtRate).count(), 1);
    }

    // ── Frequency on scaled clusters ──────────────────────────────────────────

    #[test]
    fn csf_frequency_respects_effective_floor() {
        // One server of 0.2 on four cores: m_min = 1, raw = 400, which
        // would round to 500 but the 1000 floor applies.
        let p = Platform::from_clusters(vec![(4, vec![500.0, 1000.0, 1500.0, 2000.0], 1000.0, 1.0)])
            .unwrap();
        let tasks = vec![TaskInfo::new(1, 0.2, 10.0, vec![0.0])];
        let trace = |frequency: f64| {
            let mut trace = start(0.0, 1, 0.2, 10.0);
            trace.push(at(0.0, Event::FrequencyUpdate { cluster_id: 0, frequency }));
            trace
        };

        let floored = verify_trace(&trace(1000.0), &p, &tasks, Policy::Csf, false);
        assert!(floored.passed(), "{:?}", floored.violations);

        let report = verify_trace(&trace(500.0), &p, &tasks, Policy::Csf, false);
        let csf: Vec<_> = report.of_kind(InvariantKind::CsfFrequency).collect();
        assert_eq!(csf.len(), 1);
        assert!(csf[0].message.contains("expected=1000.0"), "{}", csf[0].message);
        assert!(csf[0].message.contains("m_min=1"), "{}", csf[0].message);
    }

    #[test]
    fn power_aware_frequency_uses_scaled_utilization_off_reference() {
        // Two servers of 0.8 on cluster 1 scale to 0.2 each:
        // raw = 2000 * (0.4 + 0.2) / 2 = 600, rounded up to 1000.
        // Unscaled inputs would saturate the cluster at 2000.
        let p = two_clusters();
        let tasks = vec![
            TaskInfo::new(1, 0.8, 10.0, vec![0.0]),
            TaskInfo::new(2, 0.8, 10.0, vec![0.0]),
        ];
        let trace = |frequency: f64| {
            let mut trace = start_on(1, 0.0, 1, 0.8, 10.0);
            trace.extend(start_on(1, 0.0, 2, 0.8, 10.0));
            trace.push(at(0.0, Event::FrequencyUpdate { cluster_id: 1, frequency }));
            trace
        };

        let scaled = verify_trace(&trace(1000.0), &p, &tasks, Policy::Pa, false);
        assert!(scaled.passed(), "{:?}", scaled.violations);

        let report = verify_trace(&trace(2000.0), &p, &tasks, Policy::Pa, false);
        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.kind, InvariantKind::PowerAwareFrequency);
        assert!(v.message.contains("cluster=1"), "{}", v.message);
        assert!(v.message.contains("total_u=0.4000"), "{}", v.message);
    }
}
