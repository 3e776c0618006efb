//! Command implementations for evuctl CLI
//!
//! Probe commands return `Ok(true)` when their check passed and `Ok(false)`
//! when it ran to completion but failed; main maps that to the exit status.

pub mod dns;
pub mod funnel;
pub mod prod;
pub mod schema;
pub mod sweep;

use evuctl_core::EvuConfig;

use crate::ui::OutputFormat;

// Re-export dispatcher functions for flat access from main.rs
pub use dns::run_dns;
pub use funnel::run_funnel;
pub use prod::run_prod;
pub use schema::run_schema;
pub use sweep::run_sweep;

/// Loaded configuration plus global output options
#[derive(Debug, Clone)]
pub struct Context {
    pub config: EvuConfig,
    pub format: OutputFormat,
}

impl Context {
    pub fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
