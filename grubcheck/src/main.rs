/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use grubcheck::config::RunConfig;
use grubcheck::platform::Platform;
use grubcheck::policy::Policy;
use grubcheck::report;
use grubcheck::runner::{
    check_trace_file, discover_generated, discover_handcrafted, Orchestrator, RunOutcome,
    RunResult, ScenarioSpec, Simulator,
};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Run scenarios through the scheduling simulator and check every trace
/// against the GRUB / EDF / DVFS invariants.
///
/// Example:
///   grubcheck --platform platforms/exynos5422LITTLE.json \
///             --scenarios-dir tests/scenarios \
///             --generated-dir tests/scenarios/generated \
///             --schedsim build/apps/schedsim-new -j 8
#[derive(Debug, Parser)]
#[command(
    name = "grubcheck",
    about = "Trace-based conformance checker for GRUB scheduling policies",
    long_about = None,
)]
struct Cli {
    /// Platform JSON file.
    #[arg(long, default_value = "platforms/exynos5422LITTLE.json")]
    platform: PathBuf,

    /// Directory of hand-crafted scenario files.
    #[arg(long = "scenarios-dir", default_value = "tests/scenarios")]
    scenarios_dir: PathBuf,

    /// Directory of generated scenario files (`u<level>_<n>.json`).
    #[arg(long = "generated-dir", default_value = "tests/scenarios/generated")]
    generated_dir: PathBuf,

    /// Simulator binary.
    #[arg(long, default_value = "build/apps/schedsim-new")]
    schedsim: PathBuf,

    /// Concurrent runs (default: available parallelism).
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Skip hand-crafted scenarios.
    #[arg(long = "no-handcrafted", default_value_t = false)]
    no_handcrafted: bool,

    /// Skip generated scenarios.
    #[arg(long = "no-generated", default_value_t = false)]
    no_generated: bool,

    /// Print diagnostic context for every VT-rate violation.
    #[arg(long = "dump-violations", default_value_t = false)]
    dump_violations: bool,

    /// Only run scenarios whose file name contains this substring.
    #[arg(long = "scenario-filter")]
    scenario_filter: Option<String>,

    /// YAML run configuration (timeout, policies, simulator flags).
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Check this pre-recorded trace instead of running the simulator.
    /// Requires --scenario and --policy.
    #[arg(long, requires = "scenario", requires = "policy")]
    trace: Option<PathBuf>,

    /// Scenario the pre-recorded trace was produced from.
    #[arg(long, requires = "trace")]
    scenario: Option<PathBuf>,

    /// Policy the pre-recorded trace was produced with.
    #[arg(long, requires = "trace")]
    policy: Option<Policy>,
}

fn fatal(message: impl std::fmt::Display) -> ! {
    error!("{message}");
    process::exit(1);
}

fn require_file(path: &Path, what: &str) {
    if !path.is_file() {
        fatal(format!("{what} not found: {}", path.display()));
    }
}

fn require_dir(path: &Path, what: &str) {
    if !path.is_dir() {
        fatal(format!("{what} not found: {}", path.display()));
    }
}

fn print_dumps(results: &[RunResult]) {
    for r in results {
        if let RunOutcome::Completed(report) = &r.outcome {
            for dump in &report.diagnostics {
                println!("[{}]\n{dump}", r.label());
            }
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Logs go to stderr; the report owns stdout.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        platform = %cli.platform.display(),
        scenarios_dir = %cli.scenarios_dir.display(),
        generated_dir = %cli.generated_dir.display(),
        schedsim = %cli.schedsim.display(),
        jobs = ?cli.jobs,
        config = ?cli.config,
        "Configuration"
    );

    let config = RunConfig::load(cli.config.as_deref())
        .unwrap_or_else(|e| fatal(format!("Failed to load run configuration: {e:#}")));

    // ── Validate paths ────────────────────────────────────────────────────────
    require_file(&cli.platform, "Platform file");

    let platform = Platform::load_from_file(&cli.platform)
        .unwrap_or_else(|e| fatal(format!("Failed to load platform: {e}")));
    for c in platform.clusters() {
        info!(
            "  Cluster {}: {} procs, freq={:?}, perf={}, scale_speed={}",
            c.id, c.num_procs, c.frequencies, c.perf_score, c.scale_speed
        );
    }

    // ── Single recorded trace ─────────────────────────────────────────────────
    if let (Some(trace), Some(scenario), Some(policy)) = (&cli.trace, &cli.scenario, cli.policy) {
        require_file(trace, "Trace file");
        require_file(scenario, "Scenario file");
        let report = check_trace_file(trace, &platform, scenario, policy, cli.dump_violations)
            .unwrap_or_else(|e| fatal(format!("Cannot check {}: {e}", trace.display())));
        for v in &report.violations {
            println!("{v}");
        }
        for dump in &report.diagnostics {
            println!("{dump}");
        }
        if report.passed() {
            println!("PASS");
            process::exit(0);
        }
        println!("FAIL ({} violations)", report.violations.len());
        process::exit(1);
    }

    if !cli.no_handcrafted {
        require_dir(&cli.scenarios_dir, "Scenarios directory");
    }
    if !cli.no_generated {
        require_dir(&cli.generated_dir, "Generated scenarios directory");
    }
    require_file(&cli.schedsim, "Simulator binary");

    let jobs = cli.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let policies: Vec<&str> = config.policies.iter().map(|p| p.name()).collect();
    println!("Platform: {}", cli.platform.display());
    println!("Policies: {}", policies.join(", "));
    println!("Workers: {jobs}");

    let max_details = config.max_failure_details;
    let simulator = Simulator::new(cli.schedsim.clone(), cli.platform.clone(), config.timeout);
    let orchestrator = Orchestrator::new(platform, simulator, config, jobs, cli.dump_violations);
    let filter = cli.scenario_filter.as_deref();

    let progress = |done: usize, total: usize, r: &RunResult| {
        println!("  [{done}/{total}] {} ... {}", r.label(), r.status());
    };

    let mut overall_pass = true;

    // ── Hand-crafted scenarios ────────────────────────────────────────────────
    if !cli.no_handcrafted {
        let scenarios: Vec<ScenarioSpec> =
            discover_handcrafted(&cli.scenarios_dir, orchestrator.config(), filter)
                .unwrap_or_else(|e| {
                    fatal(format!("Cannot list {}: {e}", cli.scenarios_dir.display()))
                });
        println!(
            "\n--- Hand-crafted scenarios: {} files in {} ---\n",
            scenarios.len(),
            cli.scenarios_dir.display()
        );

        let results = orchestrator.run_all(&scenarios, progress).await;
        print_dumps(&results);
        println!();
        print!("{}", report::handcrafted_summary(&results));
        overall_pass &= report::all_passed(&results);
    }

    // ── Generated scenarios ───────────────────────────────────────────────────
    if !cli.no_generated {
        let scenarios = discover_generated(&cli.generated_dir, filter).unwrap_or_else(|e| {
            fatal(format!("Cannot list {}: {e}", cli.generated_dir.display()))
        });
        let runs = scenarios.len() * orchestrator.config().policies.len();
        println!(
            "\n--- Generated scenarios: {} files ({runs} runs) in {} ---\n",
            scenarios.len(),
            cli.generated_dir.display()
        );

        if scenarios.is_empty() {
            warn!("No generated scenarios found");
        } else {
            let results = orchestrator.run_all(&scenarios, progress).await;
            print_dumps(&results);
            println!();
            print!("{}", report::generated_summary(&results, max_details));
            overall_pass &= report::all_passed(&results);
        }
    }

    // ── Final verdict ─────────────────────────────────────────────────────────
    if !cli.no_handcrafted && !cli.no_generated {
        if overall_pass {
            println!("\n=== ALL CHECKS PASSED ===");
        } else {
            println!("\n=== SOME CHECKS FAILED ===");
        }
    }

    process::exit(if overall_pass { 0 } else { 1 });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
