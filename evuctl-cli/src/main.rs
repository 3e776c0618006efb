//! evuctl CLI - Connectivity and schema probes for the tariff funnel backend
//!
//! Subcommands:
//! - `dns`: resolve the project's candidate hostnames
//! - `sweep`: find a working pooler region/username/port combination
//! - `schema`: check a column's existence via a probe insert
//! - `funnel`: smoke test the pricing endpoint and frontend
//! - `prod`: pricing + contract import against the deployed API
//! - `config`: manage ~/.evuctl/config.toml

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use evuctl_core::config::{load_dotenv, log_level_from_env};
use evuctl_core::{EvuConfig, ProbeError};
use tracing::info;

mod commands;
mod config;
mod tracing_setup;
mod ui;

use commands::Context;
use ui::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "evuctl",
    author,
    version,
    about = "Connectivity and schema probes for the tariff funnel backend",
    long_about = "Diagnose the managed Postgres backend and the funnel API: resolve hostnames, \
                  sweep pooler connection parameters, probe table schema and run the \
                  pricing-to-contract flow end to end."
)]
struct Cli {
    /// Suppress progress spinners (for scripts and CI)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.evuctl/config.toml)
    #[arg(long, global = true, value_name = "PATH", env = "EVUCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Extra .env file loaded before ./.env (e.g. .env.test)
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Output format for probe results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve candidate hostnames for the project
    Dns(commands::dns::DnsArgs),
    /// Try pooler regions, usernames and ports until one connects
    Sweep(commands::sweep::SweepArgs),
    /// Check whether a column exists using a probe insert
    Schema(commands::schema::SchemaArgs),
    /// Smoke test a local funnel server (pricing + frontend)
    Funnel(commands::funnel::FunnelArgs),
    /// Run pricing and contract import against the deployed API
    Prod(commands::prod::ProdArgs),
    /// Manage evuctl configuration (init, show, get, validate, path)
    Config(config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    // .env first so LOG_LEVEL and friends are visible to tracing setup
    let env_files = load_dotenv(cli.env_file.as_deref())?;

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        log_level: log_level_from_env(),
    })?;
    if !env_files.is_empty() {
        let names: Vec<String> = env_files.iter().map(|p| p.display().to_string()).collect();
        info!("Loaded environment from: {}", names.join(", "));
    }

    ui::init_quiet_mode(cli.quiet || cli.format == OutputFormat::Json);

    let config_path = cli.config.as_deref();
    let context = || -> Result<Context> {
        let config = EvuConfig::load(config_path).with_context(|| match config_path {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load config".to_string(),
        })?;
        Ok(Context {
            config,
            format: cli.format,
        })
    };

    match cli.command {
        Commands::Dns(args) => commands::run_dns(args, &context()?).await,
        Commands::Sweep(args) => commands::run_sweep(args, &context()?).await,
        Commands::Schema(args) => commands::run_schema(args, &context()?).await,
        Commands::Funnel(args) => commands::run_funnel(args, &context()?).await,
        Commands::Prod(args) => commands::run_prod(args, &context()?).await,
        Commands::Config(args) => config::run_config(args, config_path),
        Commands::Completions(args) => run_completions(args),
    }
}

/// Print a top-level failure, including HTTP details when the probe got a response
fn report_error(err: &anyhow::Error) {
    eprintln!("✗ Error: {err:#}");
    if let Some(probe) = err.downcast_ref::<ProbeError>() {
        for line in commands::prod::error_details(probe) {
            eprintln!("{line}");
        }
    }
}

fn run_completions(args: CompletionsArgs) -> Result<bool> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());
    Ok(true)
}
