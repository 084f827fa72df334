/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: tolerant comparison, the GRUB bandwidth formula
//! and the DVFS frequency formulas.
//!
//! These are free functions rather than tracker methods so they can be used
//! and tested independently of any trace state.

/// Absolute tolerance for numeric comparisons.
pub const ABS_TOL: f64 = 1e-4;

/// Relative tolerance for numeric comparisons.
pub const REL_TOL: f64 = 1e-4;

/// Tolerance of the `virtual_time <= deadline` check.
pub const VT_DEADLINE_TOL: f64 = 1e-4;

/// Wall-clock intervals at or below this length are not rate-checked.
pub const MIN_VT_INTERVAL: f64 = 1e-9;

/// Arrivals within this distance of "now" are not considered future jobs.
pub const FUTURE_ARRIVAL_EPS: f64 = 1e-9;

/// `|a - b| <= ABS_TOL` or `|a - b| / max(|a|, |b|) <= REL_TOL`.
pub fn approx_eq(a: f64, b: f64) -> bool {
    let diff = (a - b).abs();
    if diff <= ABS_TOL {
        return true;
    }
    let denom = a.abs().max(b.abs());
    denom == 0.0 || diff / denom <= REL_TOL
}

/// GRUB bandwidth of a cluster with `m` processors whose attached servers
/// have the given scaled utilizations.
///
/// ```text
/// inactive  = m - (m-1)*u_max - total_U
/// bandwidth = 1 - inactive / m
/// ```
///
/// An empty server set yields exactly `1.0`.  A result `<= 0` signals an
/// over-subscribed cluster; callers skip dependent checks in that case.
pub fn grub_bandwidth(m: usize, scaled_utils: &[f64]) -> f64 {
    if scaled_utils.is_empty() {
        return 1.0;
    }
    let m = m as f64;
    let total_u: f64 = scaled_utils.iter().sum();
    let u_max = scaled_utils.iter().copied().fold(f64::MIN, f64::max);
    let inactive = m - (m - 1.0) * u_max - total_u;
    1.0 - inactive / m
}

/// Continuous frequency target `f_max * (total_u + (m-1)*u_max) / m`.
///
/// Shared by all three DVFS policies; they differ in which utilizations and
/// which core count they feed in.
pub fn raw_frequency(f_max: f64, total_u: f64, u_max: f64, m: usize) -> f64 {
    let m = m as f64;
    f_max * (total_u + (m - 1.0) * u_max) / m
}

/// Reduced active core count used by CSF:
/// `clamp(ceil((active_u - u_max) / (1 - u_max)), 1, m)`, or `m` when the
/// largest server alone saturates a core.
pub fn csf_active_cores(active_u: f64, u_max: f64, m: usize) -> usize {
    if u_max >= 1.0 {
        return m;
    }
    let needed = ((active_u - u_max) / (1.0 - u_max)).ceil();
    if needed <= 1.0 {
        1
    } else {
        (needed as usize).min(m)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
