/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Invariant kinds and the violations recorded against them.

use std::fmt;

use crate::policy::Policy;
use crate::scenario::TaskId;

/// The eight invariant families checked against a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvariantKind {
    /// A job completes no later than its server's deadline.
    NoDeadlineMiss,
    /// A server's virtual time never runs past its deadline.
    VtLeDeadline,
    /// A scheduled server has the earliest deadline among Ready servers.
    EdfOrdering,
    /// Replenished budget follows the GRUB budget formula.
    BudgetFormula,
    /// Virtual time advances at `bandwidth / scaled_U`.
    VtRate,
    /// Power-aware frequency selection.
    PowerAwareFrequency,
    /// FFA frequency selection.
    FfaFrequency,
    /// CSF frequency selection.
    CsfFrequency,
}

impl InvariantKind {
    /// All kinds in reporting order.
    pub const ALL: [InvariantKind; 8] = [
        InvariantKind::NoDeadlineMiss,
        InvariantKind::VtLeDeadline,
        InvariantKind::EdfOrdering,
        InvariantKind::BudgetFormula,
        InvariantKind::VtRate,
        InvariantKind::PowerAwareFrequency,
        InvariantKind::FfaFrequency,
        InvariantKind::CsfFrequency,
    ];

    /// Machine name, used as the message prefix and in summaries.
    pub fn name(self) -> &'static str {
        match self {
            InvariantKind::NoDeadlineMiss => "no_deadline_miss",
            InvariantKind::VtLeDeadline => "vt_le_deadline",
            InvariantKind::EdfOrdering => "edf_ordering",
            InvariantKind::BudgetFormula => "budget_formula",
            InvariantKind::VtRate => "vt_rate",
            InvariantKind::PowerAwareFrequency => "frequency_formula",
            InvariantKind::FfaFrequency => "ffa_frequency",
            InvariantKind::CsfFrequency => "csf_frequency",
        }
    }

    /// Column label for the summary table.
    pub fn label(self) -> &'static str {
        match self {
            InvariantKind::NoDeadlineMiss => "No Deadline Miss",
            InvariantKind::VtLeDeadline => "VT <= Deadline",
            InvariantKind::EdfOrdering => "EDF Ordering",
            InvariantKind::BudgetFormula => "Budget Formula",
            InvariantKind::VtRate => "VT Rate",
            InvariantKind::PowerAwareFrequency => "Frequency (PA)",
            InvariantKind::FfaFrequency => "Frequency (FFA)",
            InvariantKind::CsfFrequency => "Frequency (CSF)",
        }
    }

    /// Whether this invariant is meaningful for runs of `policy`.
    ///
    /// The frequency invariants only apply to their own DVFS policy; they are
    /// reported as N/A elsewhere.
    pub fn applies_to(self, policy: Policy) -> bool {
        match self {
            InvariantKind::PowerAwareFrequency
            | InvariantKind::FfaFrequency
            | InvariantKind::CsfFrequency => policy.frequency_invariant() == Some(self),
            _ => true,
        }
    }
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One recorded invariant violation.
///
/// `message` always starts with the invariant name so a bare message is
/// self-describing in logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: InvariantKind,
    pub time: f64,
    /// `None` for cluster-level invariants (frequency checks).
    pub tid: Option<TaskId>,
    pub message: String,
}

impl Violation {
    pub fn new(kind: InvariantKind, time: f64, tid: Option<TaskId>, detail: String) -> Self {
        Self {
            kind,
            time,
            tid,
            message: format!("{}: {detail}", kind.name()),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:.6}", self.time)?;
        if let Some(tid) = self.tid {
            write!(f, " tid={tid}")?;
        }
        write!(f, " {}", self.message)
    }
}
