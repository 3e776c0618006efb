//! `evuctl schema` - check a column's existence with a probe insert

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use evuctl_core::config::{require_secret, BACKEND_KEY_VAR};
use evuctl_core::schema::{probe_schema, ProbeRecord, RestBackend, SchemaVerdict};

use super::Context;
use crate::ui;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Table to insert into (default: backend.table)
    #[arg(long)]
    pub table: Option<String>,

    /// Column whose existence is checked (default: backend.probe_column)
    #[arg(long)]
    pub column: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "15")]
    pub timeout: u64,
}

/// Passes when the insert succeeded, i.e. the column exists.
pub async fn run_schema(args: SchemaArgs, ctx: &Context) -> Result<bool> {
    let config = &ctx.config;
    let table = args.table.unwrap_or_else(|| config.backend.table.clone());
    let column = args.column.unwrap_or_else(|| config.backend.probe_column.clone());

    let api_key = require_secret(BACKEND_KEY_VAR)?;
    let timeout = Duration::from_secs(args.timeout);
    let backend = RestBackend::new(config.backend_url()?, api_key, timeout)?;
    let record = ProbeRecord::synthetic(&config.production.email_domain);

    let pb = ui::spinner(format!("Inserting probe row into {table}..."));
    let report = probe_schema(&backend, &table, &column, &record).await;
    ui::clear(pb);
    let report = report?;

    if ctx.json() {
        ui::print_json(&report)?;
    } else {
        let label = format!("{}.{}", report.table, report.column);
        match &report.verdict {
            SchemaVerdict::ColumnExists => {
                let detail = format!("column exists (row inserted for {})", report.email);
                ui::pass_line(&label, detail)
            }
            SchemaVerdict::TableMissing { code, message } => {
                ui::fail_line(&label, format!("table missing [{code}] {message}"))
            }
            SchemaVerdict::ColumnMissing { code, message } => {
                ui::fail_line(&label, format!("column missing [{code}] {message}"))
            }
            SchemaVerdict::OtherError { code, message } => ui::fail_line(
                &label,
                format!(
                    "insert failed [{}] {}",
                    code.as_deref().unwrap_or("no code"),
                    message
                ),
            ),
            SchemaVerdict::Inconclusive => ui::fail_line(
                &label,
                format!("HTTP {} without data or error", report.response.status),
            ),
        }
    }

    Ok(report.verdict.is_column_present())
}
