//! DNS prober: resolves the candidate hostnames of a hosted project.

use std::io;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EvuConfig;
use crate::error::Result;

/// Hostname resolution seam, so probes can run against a stub.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// System resolver (getaddrinfo via tokio), default timeouts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in tokio::net::lookup_host((host, 0)).await? {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        Ok(ips)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostOutcome {
    Resolved { addrs: Vec<IpAddr> },
    Failed { code: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub host: String,
    #[serde(flatten)]
    pub outcome: HostOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DnsReport {
    pub hosts: Vec<HostReport>,
}

impl DnsReport {
    pub fn resolved_count(&self) -> usize {
        self.hosts
            .iter()
            .filter(|h| matches!(h.outcome, HostOutcome::Resolved { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.hosts.len() - self.resolved_count()
    }
}

/// Ordered candidate hostnames for the configured project.
///
/// Extra hosts first, then per domain the bare project host and one host per
/// service, then the pooler host of each sweep region. Duplicates keep their
/// first position.
pub fn candidate_hosts(config: &EvuConfig) -> Result<Vec<String>> {
    let mut hosts: Vec<String> = config.dns.extra_hosts.clone();

    if !config.dns.domains.is_empty() {
        let project_ref = config.project_ref()?;
        for domain in &config.dns.domains {
            hosts.push(format!("{project_ref}.{domain}"));
            for service in &config.dns.services {
                hosts.push(format!("{service}.{project_ref}.{domain}"));
            }
        }
    }

    for region in &config.sweep.regions {
        hosts.push(pooler_host(region, &config.project.provider_domain));
    }

    let mut unique = Vec::with_capacity(hosts.len());
    for host in hosts {
        if !unique.contains(&host) {
            unique.push(host);
        }
    }
    Ok(unique)
}

/// `aws-0-<region>.pooler.<provider-domain>`
pub fn pooler_host(region: &str, provider_domain: &str) -> String {
    format!("aws-0-{region}.pooler.{provider_domain}")
}

/// Resolve every host in order. A failure is recorded and never stops the
/// remaining lookups.
pub async fn probe_hosts<R, I>(resolver: &R, hosts: I) -> DnsReport
where
    R: Resolver + ?Sized,
    I: IntoIterator<Item = String>,
{
    let mut report = DnsReport::default();

    for host in hosts {
        debug!(host = %host, "resolving");
        let outcome = match resolver.resolve(&host).await {
            Ok(addrs) if addrs.is_empty() => HostOutcome::Failed {
                code: "ENODATA".to_string(),
                message: "no address records".to_string(),
            },
            Ok(addrs) => {
                info!(host = %host, addrs = ?addrs, "resolved");
                HostOutcome::Resolved { addrs }
            }
            Err(e) => {
                let code = failure_code(&e);
                warn!(host = %host, code = %code, "resolution failed: {}", e);
                HostOutcome::Failed {
                    code,
                    message: e.to_string(),
                }
            }
        };
        report.hosts.push(HostReport { host, outcome });
    }

    report
}

/// Short resolver error code derived from an I/O error.
pub fn failure_code(err: &io::Error) -> String {
    let message = err.to_string().to_lowercase();
    if message.contains("name or service not known")
        || message.contains("nodename nor servname")
        || message.contains("no such host")
        || err.kind() == io::ErrorKind::NotFound
    {
        "ENOTFOUND".to_string()
    } else if message.contains("temporary failure") || message.contains("try again") {
        "EAI_AGAIN".to_string()
    } else if message.contains("no address associated") {
        "ENODATA".to_string()
    } else if err.kind() == io::ErrorKind::TimedOut {
        "ETIMEDOUT".to_string()
    } else if let Some(code) = err.raw_os_error() {
        format!("OS{code}")
    } else {
        format!("{:?}", err.kind())
    }
}
