//! `evuctl dns` - resolve the project's candidate hostnames

use anyhow::{Context as _, Result};
use clap::Args;
use evuctl_core::dns::{candidate_hosts, probe_hosts, HostOutcome, SystemResolver};

use super::Context;
use crate::ui;

#[derive(Args, Debug)]
pub struct DnsArgs {
    /// Additional hostname to resolve (repeatable)
    #[arg(long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Resolve only the --host names, skipping the derived candidates
    #[arg(long, requires = "hosts")]
    pub only: bool,
}

/// Passes when at least one hostname resolves.
pub async fn run_dns(args: DnsArgs, ctx: &Context) -> Result<bool> {
    let hosts = if args.only {
        args.hosts
    } else {
        let mut config = ctx.config.clone();
        config.dns.extra_hosts.extend(args.hosts);
        candidate_hosts(&config).context("Failed to build candidate hostnames")?
    };

    let pb = ui::spinner(format!("Resolving {} hostnames...", hosts.len()));
    let report = probe_hosts(&SystemResolver, hosts).await;
    ui::clear(pb);

    if ctx.json() {
        ui::print_json(&report)?;
    } else {
        for entry in &report.hosts {
            match &entry.outcome {
                HostOutcome::Resolved { addrs } => {
                    let addrs: Vec<String> = addrs.iter().map(|a| a.to_string()).collect();
                    ui::pass_line(&entry.host, addrs.join(", "));
                }
                HostOutcome::Failed { code, message } => {
                    ui::fail_line(&entry.host, format!("{code} ({message})"));
                }
            }
        }
        println!(
            "\n{}/{} hostnames resolved",
            report.resolved_count(),
            report.hosts.len()
        );
    }

    Ok(report.resolved_count() > 0)
}
