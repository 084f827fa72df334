/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling policies under test.
//!
//! Every policy is global EDF with GRUB reclaiming; the three DVFS variants
//! additionally pick the cluster frequency from utilization data.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::checker::InvariantKind;

/// Policy selector passed to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// GRUB reclaiming, no DVFS.
    Grub,
    /// GRUB + power-aware frequency selection.
    Pa,
    /// GRUB + FFA frequency selection.
    Ffa,
    /// GRUB + CSF frequency selection (with core shutdown).
    Csf,
}

impl Policy {
    /// All policies in reporting order.
    pub const ALL: [Policy; 4] = [Policy::Grub, Policy::Pa, Policy::Ffa, Policy::Csf];

    pub fn name(self) -> &'static str {
        match self {
            Policy::Grub => "grub",
            Policy::Pa => "pa",
            Policy::Ffa => "ffa",
            Policy::Csf => "csf",
        }
    }

    /// Simulator command-line flags selecting this policy.
    pub fn default_flags(self) -> Vec<String> {
        let dvfs = match self {
            Policy::Grub => None,
            Policy::Pa => Some("power-aware"),
            Policy::Ffa => Some("ffa"),
            Policy::Csf => Some("csf"),
        };
        let mut flags = vec!["--reclaim".to_string(), "grub".to_string()];
        if let Some(d) = dvfs {
            flags.push("--dvfs".to_string());
            flags.push(d.to_string());
        }
        flags
    }

    /// The frequency invariant checked for this policy, if any.
    pub fn frequency_invariant(self) -> Option<InvariantKind> {
        match self {
            Policy::Grub => None,
            Policy::Pa => Some(InvariantKind::PowerAwareFrequency),
            Policy::Ffa => Some(InvariantKind::FfaFrequency),
            Policy::Csf => Some(InvariantKind::CsfFrequency),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Policy::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown policy '{s}' (valid: grub, pa, ffa, csf)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_select_reclaim_and_dvfs() {
        assert_eq!(Policy::Grub.default_flags(), vec!["--reclaim", "grub"]);
        assert_eq!(
            Policy::Pa.default_flags(),
            vec!["--reclaim", "grub", "--dvfs", "power-aware"]
        );
        assert_eq!(
            Policy::Csf.default_flags(),
            vec!["--reclaim", "grub", "--dvfs", "csf"]
        );
    }

    #[test]
    fn parse_round_trips_names() {
        for p in Policy::ALL {
            assert_eq!(p.name().parse::<Policy>().unwrap(), p);
        }
        assert!("edf".parse::<Policy>().is_err());
    }

    #[test]
    fn only_dvfs_policies_have_frequency_invariants() {
        assert_eq!(Policy::Grub.frequency_invariant(), None);
        assert_eq!(
            Policy::Ffa.frequency_invariant(),
            Some(InvariantKind::FfaFrequency)
        );
    }
}
