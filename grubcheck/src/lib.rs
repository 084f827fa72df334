/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! grubcheck – trace-based conformance checker for GRUB / global EDF /
//! DVFS scheduling policies.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── platform/   – clusters, operating frequencies, ceil_to_mode
//! ├── scenario    – declared task set of one scenario
//! ├── trace/      – trace event model, decoding, same-timestamp batches
//! ├── policy      – policies under test and their simulator flags
//! ├── checker/    – state tracker, dispatcher, invariant checks
//! ├── runner/     – scenario discovery, simulator subprocess, worker pool
//! ├── report/     – hand-crafted and generated summaries
//! ├── config/     – YAML run configuration
//! └── error       – load / run error types
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod platform;
pub mod policy;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod trace;
