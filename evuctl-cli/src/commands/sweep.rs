//! `evuctl sweep` - find pooler connection parameters that work

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use evuctl_core::config::{require_secret, DB_PASSWORD_VAR};
use evuctl_core::sweep::{sweep, AttemptOutcome, CandidateSpace, PgConnector, SweepTarget};
use serde::Serialize;

use super::Context;
use crate::ui;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Regions to try, in order (comma-separated; replaces the configured list)
    #[arg(long = "region", value_delimiter = ',', value_name = "REGION")]
    pub regions: Vec<String>,

    /// Username formats, `{project}` is replaced by the project ref
    #[arg(long = "user-format", value_delimiter = ',', value_name = "FORMAT")]
    pub user_formats: Vec<String>,

    /// Ports to try (comma-separated)
    #[arg(long = "port", value_delimiter = ',', value_name = "PORT")]
    pub ports: Vec<u16>,

    /// Per-attempt connection timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// List candidates in sweep order without connecting
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
struct PlannedCandidate {
    candidate: String,
    url: String,
}

/// Passes when some candidate connects (always passes with --dry-run).
pub async fn run_sweep(args: SweepArgs, ctx: &Context) -> Result<bool> {
    let mut sweep_config = ctx.config.sweep.clone();
    if !args.regions.is_empty() {
        sweep_config.regions = args.regions;
    }
    if !args.user_formats.is_empty() {
        sweep_config.username_formats = args.user_formats;
    }
    if !args.ports.is_empty() {
        sweep_config.ports = args.ports;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        sweep_config.timeout_ms = timeout_ms;
    }
    if sweep_config.timeout_ms == 0 {
        bail!("timeout must be greater than 0 ms");
    }

    let space = CandidateSpace::from_config(&sweep_config);
    if space.is_empty() {
        bail!("No candidates: regions, username formats and ports must all be non-empty");
    }

    if args.dry_run {
        let target = SweepTarget::from_config(&ctx.config, String::new())?;
        let planned: Vec<PlannedCandidate> = space
            .iter()
            .map(|c| PlannedCandidate {
                url: target.target_for(&c).redacted_url(),
                candidate: c.to_string(),
            })
            .collect();
        if ctx.json() {
            ui::print_json(&planned)?;
        } else {
            for (i, p) in planned.iter().enumerate() {
                println!("{:>3}. {}  {}", i + 1, p.candidate, p.url);
            }
        }
        return Ok(true);
    }

    let password = require_secret(DB_PASSWORD_VAR)?;
    let target = SweepTarget::from_config(&ctx.config, password)?;
    let timeout = Duration::from_millis(sweep_config.timeout_ms);

    let pb = ui::spinner(format!(
        "Sweeping {} candidates ({} ms timeout each)...",
        space.len(),
        sweep_config.timeout_ms
    ));
    let report = sweep(space.iter(), &PgConnector, &target, timeout).await;
    ui::clear(pb);

    if ctx.json() {
        ui::print_json(&report)?;
    } else {
        for attempt in &report.attempts {
            match &attempt.outcome {
                AttemptOutcome::Connected => {
                    ui::pass_line(&attempt.candidate.to_string(), &attempt.url)
                }
                AttemptOutcome::Failed { error } => {
                    ui::fail_line(&attempt.candidate.to_string(), error)
                }
            }
        }
        match &report.winner {
            Some(winner) => println!(
                "\nConnected with region={} user={} port={} after {} attempt(s)",
                winner.region,
                winner.username(&target.project_ref),
                winner.port,
                report.attempts.len()
            ),
            None => println!(
                "\nNo candidate connected ({} attempted)",
                report.attempts.len()
            ),
        }
    }

    Ok(report.succeeded())
}
