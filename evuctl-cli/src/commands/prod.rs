//! `evuctl prod` - pricing + contract import against the deployed API

use anyhow::Result;
use clap::Args;
use evuctl_core::production::run_integration;
use evuctl_core::ProbeError;
use serde_json::json;

use super::Context;
use crate::ui;

#[derive(Args, Debug)]
pub struct ProdArgs {
    /// API base URL (default: API_URL, then production.base_url)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Funnel identifier sent with the pricing request
    #[arg(long)]
    pub funnel_id: Option<String>,
}

/// Passes when both steps succeed. Probe errors are reported here with
/// their HTTP status and response body rather than propagated.
pub async fn run_prod(args: ProdArgs, ctx: &Context) -> Result<bool> {
    let mut config = ctx.config.clone();
    if let Some(url) = args.base_url {
        config.production.base_url = url;
    }
    if let Some(funnel_id) = args.funnel_id {
        config.production.funnel_id = funnel_id;
    }

    let pb = ui::spinner("Running pricing and contract import...");
    let result = run_integration(&config).await;
    ui::clear(pb);

    match result {
        Ok(report) => {
            if ctx.json() {
                ui::print_json(&report)?;
            } else {
                let cost = report
                    .quote
                    .monthly_cost
                    .map(|c| format!("{c:.2} €/month"))
                    .unwrap_or_else(|| "no monthly cost".to_string());
                ui::pass_line("Pricing", format!("tariff {} ({cost})", report.quote.id));
                ui::pass_line(
                    "Contract import",
                    format!(
                        "contract {} / draft {} for {}",
                        report.contract_id.as_deref().unwrap_or("-"),
                        report.draft_id.as_deref().unwrap_or("-"),
                        report.email
                    ),
                );
            }
            Ok(true)
        }
        Err(e) => {
            if ctx.json() {
                ui::print_json(&json!({
                    "error": e.to_string(),
                    "status": e.http_status(),
                    "body": e.response_body(),
                }))?;
            } else {
                ui::fail_line("Integration test", &e);
                for line in error_details(&e) {
                    println!("{line}");
                }
            }
            Ok(false)
        }
    }
}

/// Status and body lines printed under a failed step
pub fn error_details(e: &ProbeError) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(status) = e.http_status() {
        lines.push(format!("  HTTP status: {status}"));
    }
    if let Some(body) = e.response_body() {
        lines.push(format!("  Response body: {body}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_details_include_status_and_body() {
        let err = ProbeError::status("contract import", 422, "{\"success\":false}");
        assert_eq!(
            error_details(&err),
            vec![
                "  HTTP status: 422".to_string(),
                "  Response body: {\"success\":false}".to_string(),
            ]
        );
    }

    #[test]
    fn test_error_details_for_rejection_has_body_only() {
        let err = ProbeError::rejected("pricing", "{\"erfolg\":false}");
        assert_eq!(
            error_details(&err),
            vec!["  Response body: {\"erfolg\":false}".to_string()]
        );
    }

    #[test]
    fn test_error_details_empty_without_response() {
        let err = ProbeError::config("production.base_url is not set");
        assert!(error_details(&err).is_empty());
    }
}
