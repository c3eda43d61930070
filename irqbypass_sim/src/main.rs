//! # irqbypass simulator binary
//!
//! Runs a scenario file against a fresh bypass manager.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario
//! irqbypass_sim scenarios/basic.toml
//!
//! # Verbose logging, JSON log output
//! irqbypass_sim scenarios/basic.toml -v --json
//!
//! # Write the full report
//! irqbypass_sim scenarios/basic.toml --report report.json
//! ```

#![deny(warnings)]

use clap::Parser;
use irqbypass_common::prelude::*;
use irqbypass_sim::{Scenario, SimReport, Simulation};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// irqbypass simulator - scripted producer/consumer registration
#[derive(Parser, Debug)]
#[command(name = "irqbypass_sim")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Run a bypass registration scenario against a simulated manager")]
#[command(long_about = None)]
struct Args {
    /// Scenario file (TOML)
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Enable verbose logging (overrides the scenario log level)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Write the full JSON report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match run() {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Simulation failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every step matched its expectation.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let scenario = Scenario::load(&args.scenario);
    let log_level = scenario
        .as_ref()
        .map(|s| s.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("irqbypass simulator v{} starting...", env!("CARGO_PKG_VERSION"));
    let scenario = scenario?;
    info!("Loaded scenario {:?} from {}", scenario.shared.service_name, args.scenario.display());

    let report = Simulation::new(scenario)?.run();
    print_summary(&report);

    if let Some(ref path) = args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        info!("Report written to {}", path.display());
    }

    Ok(report.passed())
}

fn print_summary(report: &SimReport) {
    println!("Scenario: {}", report.scenario);
    for step in &report.steps {
        let mark = if step.matched { "ok  " } else { "FAIL" };
        let who = step.participant.as_deref().unwrap_or("-");
        println!(
            "  [{mark}] #{:<3} {:<20} {:<16} expected {:<16} got {} ({} calls)",
            step.index,
            step.action.to_string(),
            who,
            step.expected.to_string(),
            step.outcome,
            step.calls.len()
        );
    }

    let stats = &report.stats;
    println!(
        "Producers: {}  Consumers: {}  Connections: {}",
        stats.producers, stats.consumers, stats.connections
    );
    println!(
        "Connects: {}  Failed: {}  Disconnects: {}  Violations: {}  Slow: {}",
        stats.connects,
        stats.connect_failures,
        stats.disconnects,
        stats.contract_violations,
        stats.slow_sequences
    );

    let failed = report.failures().count();
    if failed == 0 {
        println!("Result: PASS ({} steps)", report.steps.len());
    } else {
        println!("Result: FAIL ({failed} of {} steps)", report.steps.len());
    }
}

/// Setup tracing subscriber based on CLI arguments and scenario log level.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(log_level)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
