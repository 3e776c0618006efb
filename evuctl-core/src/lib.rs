//! evuctl-core - diagnostic probes for the EVU tariff funnel backend
//!
//! Each probe is a short, sequential series of network calls that returns a
//! serializable report:
//! - [`dns`]: resolve the project's candidate hostnames
//! - [`sweep`]: find pooler connection parameters that work
//! - [`schema`]: infer column existence from a probe insert
//! - [`funnel`]: smoke-test a locally running funnel server
//! - [`production`]: price a tariff and import a contract remotely

pub mod api;
pub mod config;
pub mod dns;
pub mod error;
pub mod funnel;
pub mod production;
pub mod schema;
pub mod sweep;

pub use config::EvuConfig;
pub use error::{ProbeError, Result};
