use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evuctl_core::config::secret_status;
use evuctl_core::EvuConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with default values
    Init(InitArgs),
    /// Print the effective config (file + environment overrides)
    Show,
    /// Get a config value by dot-notation key
    Get(GetArgs),
    /// Validate config and report which secrets are present
    Validate,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Project reference to store in the new config
    #[arg(long)]
    pub project_ref: Option<String>,

    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Dot-notation key (e.g., "sweep.ports")
    pub key: String,
}

/// `explicit` is the global --config path, if given.
pub fn run_config(args: ConfigArgs, explicit: Option<&Path>) -> Result<bool> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(EvuConfig::config_path);

    match args.command {
        ConfigCommands::Init(args) => run_init(args, &path),
        ConfigCommands::Show => run_show(explicit),
        ConfigCommands::Get(args) => run_get(args, explicit),
        ConfigCommands::Validate => run_validate(explicit),
        ConfigCommands::Path => run_path(&path),
    }
}

fn run_init(args: InitArgs, path: &Path) -> Result<bool> {
    if path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            path
        ));
    }

    let mut config = EvuConfig::default();
    config.project.project_ref = args.project_ref.unwrap_or_default();
    config
        .save(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    println!("✅ Config written to {}", path.display());
    println!("\nSecrets are never stored here. Set them in the environment or a .env file:");
    for (var, _) in secret_status() {
        println!("  {var}");
    }
    Ok(true)
}

fn run_show(explicit: Option<&Path>) -> Result<bool> {
    let config = EvuConfig::load(explicit)?;
    print!("{}", config.to_toml()?);
    Ok(true)
}

fn run_get(args: GetArgs, explicit: Option<&Path>) -> Result<bool> {
    let config = EvuConfig::load(explicit)?;
    println!("{}", config.get(&args.key)?);
    Ok(true)
}

fn run_validate(explicit: Option<&Path>) -> Result<bool> {
    let config = EvuConfig::load(explicit)?;
    let mut ok = true;

    match config.validate() {
        Ok(()) => println!("✓ Config is valid"),
        Err(e) => {
            println!("✗ {e}");
            ok = false;
        }
    }

    match config.project_ref() {
        Ok(project_ref) => println!("✓ Project ref: {project_ref}"),
        Err(_) => println!("⚠ Project ref not set (dns and sweep need it)"),
    }

    println!("\nSecrets:");
    for (var, present) in secret_status() {
        let mark = if present { "✓" } else { "✗" };
        let state = if present { "set" } else { "missing" };
        println!("  {mark} {var}: {state}");
    }

    Ok(ok)
}

fn run_path(path: &Path) -> Result<bool> {
    println!("{}", path.display());
    Ok(true)
}
