/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-run scheduling state reconstructed from the trace.
//!
//! [`StateTracker`] is the single source of truth for "what should be true
//! right now" given every event observed so far.  It is mutated only through
//! [`StateTracker::apply`] and [`StateTracker::post_virtual_time_update`],
//! both driven by the dispatcher; invariant checks only read it.
//!
//! # Determinism
//! Every map is a `BTreeMap`, so iteration order (and therefore the order in
//! which violations are produced) depends only on the trace.

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use super::math::{grub_bandwidth, FUTURE_ARRIVAL_EPS};
use crate::platform::{ClusterId, ClusterInfo, Platform};
use crate::scenario::{TaskId, TaskInfo};
use crate::trace::{CpuId, Event, TraceEntry};

/// Number of recent events kept for diagnostic dumps.
pub const HISTORY_LEN: usize = 30;

// ── Server state ──────────────────────────────────────────────────────────────

/// Lifecycle state of a GRUB server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    #[default]
    Inactive,
    Ready,
    Running,
    NonContinuing,
}

/// A `(wall time, virtual time)` pair from one `virtual_time_update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VtSample {
    pub time: f64,
    pub value: f64,
}

/// Tracked state of one server (one per task id).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerTracker {
    pub tid: TaskId,
    pub utilization: f64,
    pub period: f64,
    /// Current GRUB deadline.  Only lifecycle events set it.
    pub deadline: f64,
    pub virtual_time: f64,
    pub state: ServerState,
    /// Attached to the scheduler (contributes to the cluster bandwidth).
    pub in_scheduler: bool,
    /// Second most recent virtual-time update.
    pub prev_vt: Option<VtSample>,
    /// Most recent virtual-time update.
    pub cur_vt: Option<VtSample>,
    /// Running without interruption since `cur_vt`.
    pub ran_continuously: bool,
    /// The attached set of this server's cluster changed since `cur_vt`.
    pub bandwidth_may_have_changed: bool,
}

impl ServerTracker {
    fn new(tid: TaskId, utilization: f64, period: f64) -> Self {
        Self {
            tid,
            utilization,
            period,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ServerState::Ready | ServerState::Running)
    }
}

/// Per-cluster run state.
#[derive(Debug, Clone, Default)]
struct ClusterState {
    /// Largest scaled utilization ever admitted while attached.  Never
    /// decremented on detach: the power-aware policy under test keeps this
    /// watermark too.
    max_ever_scheduler_util: f64,
    /// Last reported operating frequency.
    frequency: Option<f64>,
}

// ── StateTracker ──────────────────────────────────────────────────────────────

/// Scheduling state of one run.  Create a fresh tracker for every trace.
pub struct StateTracker<'a> {
    platform: &'a Platform,
    declared: BTreeMap<TaskId, &'a TaskInfo>,
    servers: BTreeMap<TaskId, ServerTracker>,
    /// task → cluster, from `task_placed` / `migration_cluster`.  Kept apart
    /// from the servers because placement may precede server creation.
    placements: BTreeMap<TaskId, ClusterId>,
    cpu_to_tid: BTreeMap<CpuId, Option<TaskId>>,
    clusters: Vec<ClusterState>,
    /// Declared arrivals supplemented by those observed in the trace.
    future_jobs: BTreeMap<TaskId, Vec<f64>>,
    history: Option<VecDeque<TraceEntry>>,
}

impl<'a> StateTracker<'a> {
    /// Create a tracker for `platform` and the declared `tasks`.
    ///
    /// With `keep_history` the last [`HISTORY_LEN`] events are retained for
    /// diagnostic dumps.
    pub fn new(platform: &'a Platform, tasks: &'a [TaskInfo], keep_history: bool) -> Self {
        Self {
            platform,
            declared: tasks.iter().map(|t| (t.id, t)).collect(),
            servers: BTreeMap::new(),
            placements: BTreeMap::new(),
            cpu_to_tid: BTreeMap::new(),
            clusters: vec![ClusterState::default(); platform.clusters().len()],
            future_jobs: tasks
                .iter()
                .map(|t| (t.id, t.job_arrivals.clone()))
                .collect(),
            history: keep_history.then(|| VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    /// Merge every `job_arrival` timestamp of `trace` into the future-arrival
    /// lists.  The generator and the simulator need not agree exactly on
    /// future arrivals, so the declared lists are supplemented, not replaced.
    pub fn supplement_arrivals(&mut self, trace: &[TraceEntry]) {
        for entry in trace {
            if let Event::JobArrival { tid } = entry.event {
                self.future_jobs.entry(tid).or_default().push(entry.time);
            }
        }
        for arrivals in self.future_jobs.values_mut() {
            arrivals.sort_by(f64::total_cmp);
            arrivals.dedup();
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn platform(&self) -> &'a Platform {
        self.platform
    }

    pub fn server(&self, tid: TaskId) -> Option<&ServerTracker> {
        self.servers.get(&tid)
    }

    pub fn cluster_of(&self, tid: TaskId) -> Option<ClusterId> {
        self.placements.get(&tid).copied()
    }

    /// The cluster a task is placed on, if both the placement and the
    /// cluster are known.
    pub fn cluster_info_of(&self, tid: TaskId) -> Option<&'a ClusterInfo> {
        self.cluster_of(tid).and_then(|c| self.platform.cluster(c))
    }

    /// Every tracked server placed on cluster `c`, attached or not.
    pub fn all_servers_in_cluster(
        &self,
        c: ClusterId,
    ) -> impl Iterator<Item = &ServerTracker> + '_ {
        self.servers
            .values()
            .filter(move |s| self.placements.get(&s.tid) == Some(&c))
    }

    /// Servers attached to the scheduler on cluster `c`.
    pub fn servers_in_cluster(&self, c: ClusterId) -> impl Iterator<Item = &ServerTracker> + '_ {
        self.all_servers_in_cluster(c).filter(|s| s.in_scheduler)
    }

    /// Attached servers on cluster `c` that are Ready or Running.
    pub fn active_servers_in_cluster(
        &self,
        c: ClusterId,
    ) -> impl Iterator<Item = &ServerTracker> + '_ {
        self.servers_in_cluster(c).filter(|s| s.is_active())
    }

    /// `utilization * scale_speed / perf_score` of the server's cluster.
    /// Falls back to the nominal utilization while the task is unplaced.
    pub fn scaled_utilization(&self, tid: TaskId) -> f64 {
        let Some(server) = self.servers.get(&tid) else {
            return 0.0;
        };
        match self.cluster_info_of(tid) {
            Some(cluster) => cluster.scale_utilization(server.utilization),
            None => server.utilization,
        }
    }

    /// GRUB bandwidth of cluster `c` over its attached servers.
    pub fn compute_bandwidth(&self, c: ClusterId) -> f64 {
        let Some(cluster) = self.platform.cluster(c) else {
            return 1.0;
        };
        let scaled: Vec<f64> = self
            .servers_in_cluster(c)
            .map(|s| cluster.scale_utilization(s.utilization))
            .collect();
        grub_bandwidth(cluster.num_procs, &scaled)
    }

    pub fn max_ever_scheduler_util(&self, c: ClusterId) -> f64 {
        self.clusters
            .get(c)
            .map(|cs| cs.max_ever_scheduler_util)
            .unwrap_or(0.0)
    }

    pub fn cluster_frequency(&self, c: ClusterId) -> Option<f64> {
        self.clusters.get(c).and_then(|cs| cs.frequency)
    }

    /// Task currently occupying `cpu`, if any.
    pub fn running_on(&self, cpu: CpuId) -> Option<TaskId> {
        self.cpu_to_tid.get(&cpu).copied().flatten()
    }

    /// Whether `tid` has a known job arrival strictly after `after`.
    pub fn has_future_job(&self, tid: TaskId, after: f64) -> bool {
        self.future_jobs
            .get(&tid)
            .and_then(|arrivals| arrivals.last())
            .is_some_and(|&last| last > after + FUTURE_ARRIVAL_EPS)
    }

    /// Recently processed events (empty unless history is kept).
    pub fn recent_events(&self) -> impl Iterator<Item = &TraceEntry> + '_ {
        self.history.iter().flatten()
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Remember `entry` in the diagnostic history ring.
    pub fn record(&mut self, entry: &TraceEntry) {
        if let Some(history) = self.history.as_mut() {
            if history.len() == HISTORY_LEN {
                history.pop_front();
            }
            history.push_back(entry.clone());
        }
    }

    /// Apply the state transition of one event.
    pub fn apply(&mut self, time: f64, event: &Event) {
        trace!(time, kind = event.kind(), "apply");
        match *event {
            Event::JobArrival { tid } => self.on_job_arrival(tid),
            Event::TaskPlaced { tid, cluster_id } | Event::MigrationCluster { tid, cluster_id } => {
                self.placements.insert(tid, cluster_id);
            }
            Event::TaskScheduled { tid, cpu } => {
                self.cpu_to_tid.insert(cpu, Some(tid));
            }
            Event::TaskPreempted { tid } => self.on_task_preempted(tid),
            Event::ServReady {
                tid,
                deadline,
                utilization,
            } => self.on_serv_ready(time, tid, deadline, utilization),
            Event::ServRunning { tid } => {
                // Only emitted on a genuine transition into Running, so the
                // server was interrupted since its last VT update.
                if let Some(s) = self.servers.get_mut(&tid) {
                    s.ran_continuously = false;
                    s.state = ServerState::Running;
                }
            }
            Event::ServNonCont { tid } => {
                if let Some(s) = self.servers.get_mut(&tid) {
                    s.state = ServerState::NonContinuing;
                    s.ran_continuously = false;
                }
            }
            Event::ServInactive { tid } => self.on_serv_inactive(time, tid),
            Event::ServPostpone { tid, deadline } => {
                if let Some(s) = self.servers.get_mut(&tid) {
                    s.deadline = deadline;
                }
            }
            Event::VirtualTimeUpdate {
                tid, virtual_time, ..
            } => {
                if let Some(s) = self.servers.get_mut(&tid) {
                    s.prev_vt = s.cur_vt;
                    s.cur_vt = Some(VtSample {
                        time,
                        value: virtual_time,
                    });
                    s.virtual_time = virtual_time;
                }
            }
            Event::FrequencyUpdate {
                cluster_id,
                frequency,
            } => {
                if let Some(cs) = self.clusters.get_mut(cluster_id) {
                    cs.frequency = Some(frequency);
                }
            }
            Event::ProcIdled { cpu } => {
                self.cpu_to_tid.insert(cpu, None);
            }
            Event::JobFinished { .. }
            | Event::TaskRejected { .. }
            | Event::ServBudgetReplenished { .. }
            | Event::ServBudgetExhausted { .. }
            | Event::ProcActivated { .. }
            | Event::ProcSleep { .. }
            | Event::ProcChange { .. }
            | Event::Resched
            | Event::SimFinished => {}
        }
    }

    /// Second half of a `virtual_time_update`, run after its checks: the
    /// server starts a fresh continuously-running interval.
    pub fn post_virtual_time_update(&mut self, tid: TaskId) {
        if let Some(s) = self.servers.get_mut(&tid) {
            s.ran_continuously = true;
            s.bandwidth_may_have_changed = false;
        }
    }

    fn on_job_arrival(&mut self, tid: TaskId) {
        // The job's implicit deadline (arrival + period) is not the server
        // deadline; only lifecycle events set that.
        if self.servers.contains_key(&tid) {
            return;
        }
        if let Some(info) = self.declared.get(&tid) {
            self.servers
                .insert(tid, ServerTracker::new(tid, info.utilization, info.period));
        }
    }

    fn on_task_preempted(&mut self, tid: TaskId) {
        if let Some(slot) = self.cpu_to_tid.values_mut().find(|t| **t == Some(tid)) {
            *slot = None;
        }
        if let Some(s) = self.servers.get_mut(&tid) {
            s.state = ServerState::Ready;
            s.ran_continuously = false;
        }
    }

    fn on_serv_ready(&mut self, time: f64, tid: TaskId, deadline: f64, utilization: f64) {
        let period = self.declared.get(&tid).map(|t| t.period).unwrap_or(0.0);
        let server = self
            .servers
            .entry(tid)
            .or_insert_with(|| ServerTracker::new(tid, utilization, period));

        let attaching = server.state == ServerState::Inactive;
        server.state = ServerState::Ready;
        server.deadline = deadline;
        server.in_scheduler = true;

        if attaching {
            server.virtual_time = time;
            server.prev_vt = None;
            server.cur_vt = None;
            server.ran_continuously = false;
            server.bandwidth_may_have_changed = false;
        }

        let Some(cluster) = self.cluster_info_of(tid) else {
            return;
        };
        let scaled = cluster.scale_utilization(utilization);
        if let Some(cs) = self.clusters.get_mut(cluster.id) {
            cs.max_ever_scheduler_util = cs.max_ever_scheduler_util.max(scaled);
        }

        if attaching {
            self.mark_bandwidth_changed(cluster.id, tid);
        }
    }

    fn on_serv_inactive(&mut self, time: f64, tid: TaskId) {
        let detach = !self.has_future_job(tid, time);
        let Some(server) = self.servers.get_mut(&tid) else {
            return;
        };
        server.state = ServerState::Inactive;
        server.ran_continuously = false;

        if detach {
            server.in_scheduler = false;
            if let Some(c) = self.cluster_of(tid) {
                self.mark_bandwidth_changed(c, tid);
            }
        }
    }

    /// Invalidate the bandwidth baseline of every attached server of
    /// cluster `c` except `changed`.
    fn mark_bandwidth_changed(&mut self, c: ClusterId, changed: TaskId) {
        for s in self.servers.values_mut() {
            if s.tid != changed && s.in_scheduler && self.placements.get(&s.tid) == Some(&c) {
                s.bandwidth_may_have_changed = true;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
