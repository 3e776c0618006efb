//! `evuctl funnel` - smoke test against a local funnel server

use anyhow::Result;
use clap::Args;
use evuctl_core::funnel::{run_smoke, CheckResult};

use super::Context;
use crate::ui;

#[derive(Args, Debug)]
pub struct FunnelArgs {
    /// Funnel API base URL (default: funnel.base_url)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Frontend base URL, if served separately
    #[arg(long, value_name = "URL")]
    pub site_url: Option<String>,
}

/// Passes when both the pricing and the frontend check pass.
pub async fn run_funnel(args: FunnelArgs, ctx: &Context) -> Result<bool> {
    let mut config = ctx.config.funnel.clone();
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    if args.site_url.is_some() {
        config.site_url = args.site_url;
    }

    let pb = ui::spinner(format!("Checking funnel at {}...", config.base_url));
    let report = run_smoke(&config).await;
    ui::clear(pb);
    let report = report?;

    if ctx.json() {
        ui::print_json(&report)?;
    } else {
        print_check("Pricing", &report.pricing_url, &report.pricing);
        print_check("Frontend", &report.site_url, &report.frontend);

        let passed = [report.pricing.passed(), report.frontend.passed()]
            .iter()
            .filter(|p| **p)
            .count();
        println!("\n{passed}/2 checks passed");
    }

    Ok(report.all_passed())
}

fn print_check(name: &str, url: &str, check: &CheckResult) {
    let label = format!("{name} ({url})");
    match check {
        CheckResult::Passed { status, detail } => {
            ui::pass_line(&label, format!("HTTP {status}, {detail}"))
        }
        CheckResult::Failed {
            status: Some(status),
            error,
        } => ui::fail_line(&label, format!("HTTP {status}: {error}")),
        CheckResult::Failed {
            status: None,
            error,
        } => ui::fail_line(&label, error),
    }
}
