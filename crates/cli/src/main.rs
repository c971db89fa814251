// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb: benchmark remediation tools against open code-scanning findings

mod color;
mod commands;
mod env;
mod exit_error;
mod logging;
mod output;

use clap::{Parser, Subcommand};

use crate::commands::{bench, estimate, jobs, runs, timeline};
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "rb",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")"),
    about = "Benchmark remediation tools against open code-scanning findings",
    styles = color::styles(),
)]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Remediate open findings with each tool on its own branch
    Bench(bench::BenchArgs),
    /// List recorded runs
    Runs(runs::RunsArgs),
    /// Replay a run's events in order
    Timeline(timeline::TimelineArgs),
    /// List remediation jobs for a repository
    Jobs(jobs::JobsArgs),
    /// Price a tool call with the active rate table
    Estimate(estimate::EstimateArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let guard = logging::init();

    let result = match cli.command {
        Command::Bench(args) => bench::handle(args, cli.output).await,
        Command::Runs(args) => runs::handle(args, cli.output).await,
        Command::Timeline(args) => timeline::handle(args, cli.output).await,
        Command::Jobs(args) => jobs::handle(args, cli.output).await,
        Command::Estimate(args) => estimate::handle(args, cli.output),
    };

    if let Err(e) = result {
        let code = match e.downcast_ref::<ExitError>() {
            Some(exit) => exit.code,
            None => 1,
        };
        tracing::debug!(code, error = %e, "command failed");
        eprintln!("error: {e:#}");
        drop(guard);
        std::process::exit(code);
    }
}
