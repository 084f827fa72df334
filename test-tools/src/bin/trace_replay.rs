/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Stand-in for the scheduling simulator.
//!
//! Accepts the simulator command line and, instead of simulating, copies a
//! pre-recorded trace next to the scenario into the requested output file:
//!
//! ```text
//! <scenario dir>/traces/<stem>.<policy tag>.json   (preferred)
//! <scenario dir>/traces/<stem>.json                (fallback)
//! ```
//!
//! The policy tag is the `--dvfs` value, or the `--reclaim` value when no
//! DVFS policy is selected (`grub`, `power-aware`, `ffa`, `csf`).  Exits
//! non-zero when no recorded trace exists, like a crashing simulator.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "trace-replay",
    about = "Replays recorded traces in place of the scheduling simulator",
    long_about = None,
)]
struct Cli {
    /// Scenario file.
    #[arg(short = 'i')]
    input: PathBuf,

    /// Platform file (accepted, not read).
    #[arg(short = 'p')]
    platform: PathBuf,

    /// Trace output file.
    #[arg(short = 'o')]
    output: PathBuf,

    /// Reclaiming policy.
    #[arg(long)]
    reclaim: Option<String>,

    /// DVFS policy.
    #[arg(long)]
    dvfs: Option<String>,
}

fn recorded_trace(scenario: &Path, tag: Option<&str>) -> Option<PathBuf> {
    let dir = scenario.parent()?.join("traces");
    let stem = scenario.file_stem()?.to_str()?;
    let tagged = tag.map(|t| dir.join(format!("{stem}.{t}.json")));
    let plain = dir.join(format!("{stem}.json"));
    tagged.into_iter().chain([plain]).find(|p| p.is_file())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let tag = cli.dvfs.as_deref().or(cli.reclaim.as_deref());

    let Some(source) = recorded_trace(&cli.input, tag) else {
        bail!("no recorded trace for {}", cli.input.display());
    };

    info!(
        scenario = %cli.input.display(),
        platform = %cli.platform.display(),
        trace = %source.display(),
        "Replaying"
    );
    std::fs::copy(&source, &cli.output).with_context(|| {
        format!(
            "Cannot copy {} to {}",
            source.display(),
            cli.output.display()
        )
    })?;
    Ok(())
}
