//! Terminal helpers for evuctl: spinners, result lines and JSON output.
//!
//! Spinners are suppressed when:
//! - `--quiet` flag is passed
//! - `EVUCTL_QUIET=1` environment variable is set
//! - stderr is not a TTY (piped output)
//! - JSON output is requested

use std::io::IsTerminal;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Global quiet mode state
static QUIET_MODE: OnceLock<bool> = OnceLock::new();

/// Output format for probe reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable pass/fail lines
    #[default]
    Text,
    /// One JSON document per command
    Json,
}

/// Initialize quiet mode from flags and environment
///
/// Call this once at startup with the --quiet flag value.
pub fn init_quiet_mode(quiet_flag: bool) {
    let is_quiet = quiet_flag
        || std::env::var("EVUCTL_QUIET").map(|v| v == "1").unwrap_or(false)
        || !std::io::stderr().is_terminal();

    QUIET_MODE.set(is_quiet).ok();
}

pub fn is_quiet() -> bool {
    *QUIET_MODE.get().unwrap_or(&false)
}

/// Create a spinner that respects quiet mode
pub fn spinner(msg: impl Into<String>) -> Option<ProgressBar> {
    if is_quiet() {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

/// Remove a spinner before printing results
pub fn clear(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

pub fn pass_line(label: &str, detail: impl std::fmt::Display) {
    println!("✓ {label}: {detail}");
}

pub fn fail_line(label: &str, detail: impl std::fmt::Display) {
    println!("✗ {label}: {detail}");
}

/// Pretty-print a report as JSON on stdout
pub fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_flag_suppresses_spinner() {
        init_quiet_mode(true);
        assert!(is_quiet());
        assert!(spinner("probing").is_none());
    }
}
