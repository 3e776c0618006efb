//! Configuration for the evuctl probes.
//!
//! Non-secret parameters live in `~/.evuctl/config.toml` (every section is
//! optional and falls back to defaults). Secrets are only ever read from the
//! environment, which `load_dotenv` may populate from `.env` files.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ProbeError, Result};

/// Database password for pooler connections
pub const DB_PASSWORD_VAR: &str = "EVU_DB_PASSWORD";
/// Managed backend API key (sent as `apikey` and bearer token)
pub const BACKEND_KEY_VAR: &str = "EVU_BACKEND_KEY";
/// Overrides `production.base_url`
pub const API_URL_VAR: &str = "API_URL";
/// Overrides `project.project_ref`
pub const PROJECT_REF_VAR: &str = "EVU_PROJECT_REF";
/// Overrides `backend.url`
pub const BACKEND_URL_VAR: &str = "EVU_BACKEND_URL";
/// Log level from `.env.test`, used when `RUST_LOG` is unset
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
/// JWT secret of the surrounding test harness; only checked for presence
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";

/// Placeholder substituted with the project ref in username formats
pub const PROJECT_PLACEHOLDER: &str = "{project}";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EvuConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub funnel: FunnelConfig,
    #[serde(default)]
    pub production: ProductionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Hosted project identifier (subdomain of the provider)
    pub project_ref: String,
    /// Domain of the connection pooler hosts
    pub provider_domain: String,
    /// Domain of the per-project API host
    pub api_domain: String,
    pub database: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_ref: String::new(),
            provider_domain: "supabase.com".to_string(),
            api_domain: "supabase.co".to_string(),
            database: "postgres".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DnsConfig {
    pub domains: Vec<String>,
    pub services: Vec<String>,
    pub extra_hosts: Vec<String>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            domains: vec!["supabase.co".to_string(), "supabase.com".to_string()],
            services: vec!["db".to_string()],
            extra_hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    pub regions: Vec<String>,
    pub username_formats: Vec<String>,
    pub ports: Vec<u16>,
    pub timeout_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let regions = [
            "eu-central-1",
            "eu-central-2",
            "eu-west-1",
            "eu-west-2",
            "eu-west-3",
            "eu-north-1",
            "us-east-1",
            "us-east-2",
            "us-west-1",
            "us-west-2",
            "ca-central-1",
            "sa-east-1",
            "ap-south-1",
            "ap-southeast-1",
            "ap-southeast-2",
            "ap-northeast-1",
            "ap-northeast-2",
        ];
        Self {
            regions: regions.iter().map(|r| r.to_string()).collect(),
            username_formats: vec!["postgres.{project}".to_string(), "postgres".to_string()],
            ports: vec![6543, 5432],
            timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Managed API base URL; derived from the project ref when empty
    pub url: String,
    pub table: String,
    /// Column whose existence the schema probe checks
    pub probe_column: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            table: "customers".to_string(),
            probe_column: "marketing_consent".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FunnelConfig {
    pub base_url: String,
    /// Frontend root; `base_url` when unset
    pub site_url: Option<String>,
    pub pricing_path: String,
    pub plz: String,
    pub jahresverbrauch: u32,
    pub haushaltgroesse: u32,
    pub timeout_ms: u64,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            site_url: None,
            pricing_path: "/api/v1/tarife/berechnen".to_string(),
            plz: "10115".to_string(),
            jahresverbrauch: 3500,
            haushaltgroesse: 2,
            timeout_ms: 10_000,
        }
    }
}

impl FunnelConfig {
    pub fn site_url(&self) -> &str {
        self.site_url.as_deref().unwrap_or(&self.base_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProductionConfig {
    /// Remote API base URL; `API_URL` takes precedence
    pub base_url: String,
    pub pricing_path: String,
    pub import_path: String,
    pub plz: String,
    pub jahresverbrauch: u32,
    pub funnel_id: String,
    /// Domain for the generated per-run customer email
    pub email_domain: String,
    pub timeout_ms: u64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            pricing_path: "/pricing/berechnen".to_string(),
            import_path: "/contracting/import".to_string(),
            plz: "10115".to_string(),
            jahresverbrauch: 3500,
            funnel_id: "default".to_string(),
            email_domain: "example.com".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl EvuConfig {
    /// Load config from `path` or `~/.evuctl/config.toml`, then apply
    /// environment overrides.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };

        config.apply_env_with(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get config file path: ~/.evuctl/config.toml
    pub fn config_path() -> PathBuf {
        config_dir()
            .unwrap_or_else(|| PathBuf::from(".evuctl"))
            .join("config.toml")
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(API_URL_VAR) {
            self.production.base_url = url;
        }
        if let Some(project_ref) = non_empty(PROJECT_REF_VAR) {
            self.project.project_ref = project_ref;
        }
        if let Some(url) = non_empty(BACKEND_URL_VAR) {
            self.backend.url = url;
        }
    }

    /// Project ref, or a config error pointing at how to set it
    pub fn project_ref(&self) -> Result<&str> {
        let project_ref = self.project.project_ref.trim();
        if project_ref.is_empty() {
            return Err(ProbeError::config(format!(
                "project.project_ref is not set (config file or {PROJECT_REF_VAR})"
            )));
        }
        Ok(project_ref)
    }

    /// Managed backend base URL, derived from the project ref when unset
    pub fn backend_url(&self) -> Result<String> {
        let url = self.backend.url.trim();
        if !url.is_empty() {
            return Ok(url.trim_end_matches('/').to_string());
        }
        let project_ref = self.project_ref()?;
        Ok(format!("https://{}.{}", project_ref, self.project.api_domain))
    }

    /// Production API base URL
    pub fn production_url(&self) -> Result<String> {
        let url = self.production.base_url.trim();
        if url.is_empty() {
            return Err(ProbeError::config(format!(
                "production.base_url is not set (config file or {API_URL_VAR})"
            )));
        }
        Ok(url.trim_end_matches('/').to_string())
    }

    /// Check list sizes, timeouts and URLs; returns every problem at once
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.sweep.regions.is_empty() {
            errors.push("sweep.regions is empty".to_string());
        }
        if self.sweep.username_formats.is_empty() {
            errors.push("sweep.username_formats is empty".to_string());
        }
        if self.sweep.ports.is_empty() {
            errors.push("sweep.ports is empty".to_string());
        }
        if self.sweep.ports.contains(&0) {
            errors.push("sweep.ports contains 0".to_string());
        }
        if self.sweep.timeout_ms == 0 {
            errors.push("sweep.timeout_ms must be greater than 0".to_string());
        }
        if self.dns.domains.is_empty() && self.dns.extra_hosts.is_empty() {
            errors.push("dns.domains and dns.extra_hosts are both empty".to_string());
        }

        let mut urls = vec![
            ("funnel.base_url", Some(self.funnel.base_url.as_str())),
            ("funnel.site_url", self.funnel.site_url.as_deref()),
        ];
        if !self.backend.url.is_empty() {
            urls.push(("backend.url", Some(self.backend.url.as_str())));
        }
        if !self.production.base_url.is_empty() {
            urls.push(("production.base_url", Some(self.production.base_url.as_str())));
        }
        for (name, value) in urls {
            if let Some(value) = value {
                if let Err(e) = Url::parse(value) {
                    errors.push(format!("{name}: {value:?} is not a valid URL ({e})"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProbeError::config(errors.join("; ")))
        }
    }

    /// Read a value by dot-notation key (e.g. "sweep.ports")
    pub fn get(&self, key: &str) -> Result<String> {
        let root = toml::Value::try_from(self)
            .map_err(|e| ProbeError::config(format!("failed to serialize config: {e}")))?;

        let mut current = &root;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| ProbeError::config(format!("Unknown config key: {key}")))?;
        }

        Ok(match current {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ProbeError::config(format!("failed to serialize config: {e}")))
    }

    /// Save config to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

/// Get the evuctl config directory path (~/.evuctl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".evuctl"))
}

/// Read a secret from the environment. Empty values count as missing.
pub fn require_secret(var: &str) -> Result<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ProbeError::missing_secret(var)),
    }
}

/// Presence of each secret the probes know about, without the values
pub fn secret_status() -> Vec<(&'static str, bool)> {
    [DB_PASSWORD_VAR, BACKEND_KEY_VAR, JWT_SECRET_VAR]
        .into_iter()
        .map(|var| (var, require_secret(var).is_ok()))
        .collect()
}

/// Default tracing filter from `LOG_LEVEL`, if set
pub fn log_level_from_env() -> Option<String> {
    env::var(LOG_LEVEL_VAR).ok().filter(|v| !v.trim().is_empty())
}

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Variables already set in the process
/// 2. `extra` (e.g. `.env.test`), when given
/// 3. Current directory .env
/// 4. ~/.evuctl/.env
///
/// dotenvy never overwrites existing variables, so loading in this order
/// yields the priorities above.
pub fn load_dotenv(extra: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut loaded_from = Vec::new();

    if let Some(path) = extra {
        dotenvy::from_path(path).map_err(|e| {
            ProbeError::config(format!("failed to load {}: {e}", path.display()))
        })?;
        loaded_from.push(path.to_path_buf());
    }

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => loaded_from.push(env_file),
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }

    Ok(loaded_from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_cover_both_pooler_ports() {
        let config = EvuConfig::default();
        assert_eq!(config.sweep.ports, vec![6543, 5432]);
        assert_eq!(config.sweep.timeout_ms, 3000);
        assert_eq!(config.sweep.regions[0], "eu-central-1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[project]\nproject_ref = \"abcd\"\n\n[sweep]\nregions = [\"eu-west-1\"]"
        )
        .unwrap();

        let config = EvuConfig::from_file(file.path()).unwrap();
        assert_eq!(config.project.project_ref, "abcd");
        assert_eq!(config.project.provider_domain, "supabase.com");
        assert_eq!(config.sweep.regions, vec!["eu-west-1"]);
        assert_eq!(config.sweep.ports, vec![6543, 5432]);
        assert_eq!(config.backend.table, "customers");
    }

    #[test]
    fn invalid_toml_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sweep\nports = 1").unwrap();

        let err = EvuConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ProbeError::Toml { .. }));
    }

    #[test]
    fn env_overrides_apply_and_ignore_blank_values() {
        let mut config = EvuConfig::default();
        config.production.base_url = "https://configured.example".to_string();

        config.apply_env_with(lookup(&[
            (API_URL_VAR, "https://override.example"),
            (PROJECT_REF_VAR, "xyz"),
            (BACKEND_URL_VAR, "  "),
        ]));

        assert_eq!(config.production.base_url, "https://override.example");
        assert_eq!(config.project.project_ref, "xyz");
        assert_eq!(config.backend.url, "");
    }

    #[test]
    fn test_harness_database_name_is_ignored() {
        let mut config = EvuConfig::default();
        config.apply_env_with(lookup(&[("TEST_DB_NAME", "evu_test")]));
        assert_eq!(config.project.database, "postgres");
    }

    #[test]
    fn backend_url_derived_from_project_ref() {
        let mut config = EvuConfig::default();
        assert!(config.backend_url().is_err());

        config.project.project_ref = "abcd".to_string();
        assert_eq!(config.backend_url().unwrap(), "https://abcd.supabase.co");

        config.backend.url = "http://127.0.0.1:54321/".to_string();
        assert_eq!(config.backend_url().unwrap(), "http://127.0.0.1:54321");
    }

    #[test]
    fn production_url_requires_a_value() {
        let mut config = EvuConfig::default();
        let err = config.production_url().unwrap_err();
        assert!(err.to_string().contains(API_URL_VAR));

        config.production.base_url = "https://api.example/".to_string();
        assert_eq!(config.production_url().unwrap(), "https://api.example");
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut config = EvuConfig::default();
        config.sweep.ports.clear();
        config.sweep.timeout_ms = 0;
        config.funnel.base_url = "not a url".to_string();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("sweep.ports is empty"));
        assert!(message.contains("sweep.timeout_ms"));
        assert!(message.contains("funnel.base_url"));
    }

    #[test]
    fn get_reads_dot_notation_keys() {
        let config = EvuConfig::default();
        assert_eq!(config.get("backend.table").unwrap(), "customers");
        assert_eq!(config.get("sweep.timeout_ms").unwrap(), "3000");
        assert!(config.get("sweep.ports").unwrap().contains("6543"));
        assert!(config.get("sweep.nope").is_err());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = EvuConfig::default();
        config.project.project_ref = "roundtrip".to_string();
        config.funnel.site_url = Some("http://localhost:5173".to_string());
        config.save(&path).unwrap();

        let loaded = EvuConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_dotenv_reads_extra_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "EVUCTL_DOTENV_TEST_MARKER=loaded").unwrap();

        let loaded = load_dotenv(Some(file.path())).unwrap();
        assert_eq!(loaded[0].as_path(), file.path());
        assert_eq!(env::var("EVUCTL_DOTENV_TEST_MARKER").unwrap(), "loaded");
    }

    #[test]
    fn load_dotenv_missing_extra_file_is_an_error() {
        let err = load_dotenv(Some(Path::new("/nonexistent/.env.test"))).unwrap_err();
        assert!(matches!(err, ProbeError::Config { .. }));
    }

    #[test]
    fn require_secret_rejects_unset_variable() {
        let err = require_secret("EVUCTL_SECRET_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, ProbeError::MissingSecret { .. }));
    }
}
