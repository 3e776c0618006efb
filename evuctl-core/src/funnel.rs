//! Smoke test against a locally running funnel server.
//!
//! Two independent checks: pricing calculation and the frontend root. A
//! failure in one is recorded and never prevents the other from running.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{ApiResponse, FunnelClient, PricingRequest, PricingResponse};
use crate::config::FunnelConfig;
use crate::error::Result;

/// Longest response body excerpt kept in a failed check
const BODY_EXCERPT: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CheckResult {
    Passed { status: u16, detail: String },
    Failed { status: Option<u16>, error: String },
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    fn from_error_response(response: &ApiResponse) -> Self {
        Self::Failed {
            status: Some(response.status),
            error: excerpt(&response.body),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub pricing_url: String,
    pub pricing: CheckResult,
    pub tariff_count: Option<usize>,
    pub site_url: String,
    pub frontend: CheckResult,
}

impl SmokeReport {
    pub fn all_passed(&self) -> bool {
        self.pricing.passed() && self.frontend.passed()
    }
}

/// Run both checks in order: pricing POST, then frontend GET.
///
/// Only client construction can fail; check failures land in the report.
pub async fn run_smoke(config: &FunnelConfig) -> Result<SmokeReport> {
    let timeout = Duration::from_millis(config.timeout_ms);
    let api = FunnelClient::new(&config.base_url, timeout)?;
    let site = FunnelClient::new(config.site_url(), timeout)?;

    let request = PricingRequest {
        plz: config.plz.clone(),
        jahresverbrauch: config.jahresverbrauch,
        haushaltgroesse: Some(config.haushaltgroesse),
        funnel_id: None,
    };
    let (pricing, tariff_count) = check_pricing(&api, &config.pricing_path, &request).await;
    let frontend = check_frontend(&site).await;

    Ok(SmokeReport {
        pricing_url: api.url(&config.pricing_path),
        pricing,
        tariff_count,
        site_url: site.url("/"),
        frontend,
    })
}

async fn check_pricing(
    client: &FunnelClient,
    path: &str,
    request: &PricingRequest,
) -> (CheckResult, Option<usize>) {
    let response = match client.post_json(path, request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("pricing request failed: {}", e);
            return (
                CheckResult::Failed {
                    status: e.http_status(),
                    error: e.to_string(),
                },
                None,
            );
        }
    };

    if !response.is_success() {
        warn!(status = response.status, "pricing returned an error status");
        return (CheckResult::from_error_response(&response), None);
    }

    match response.json::<PricingResponse>("pricing response") {
        Ok(pricing) => {
            let count = pricing.tariff_count();
            info!(status = response.status, tariffs = count, "pricing ok");
            let detail = if pricing.is_success() {
                format!("{count} tariff options")
            } else {
                format!("{count} tariff options (success flag not set)")
            };
            (
                CheckResult::Passed {
                    status: response.status,
                    detail,
                },
                Some(count),
            )
        }
        Err(e) => (
            CheckResult::Failed {
                status: Some(response.status),
                error: e.to_string(),
            },
            None,
        ),
    }
}

async fn check_frontend(client: &FunnelClient) -> CheckResult {
    match client.get("/").await {
        Ok(response) if response.is_success() => {
            info!(status = response.status, "frontend ok");
            CheckResult::Passed {
                status: response.status,
                detail: format!("{} bytes", response.body.len()),
            }
        }
        Ok(response) => {
            warn!(status = response.status, "frontend returned an error status");
            CheckResult::from_error_response(&response)
        }
        Err(e) => {
            warn!("frontend request failed: {}", e);
            CheckResult::Failed {
                status: e.http_status(),
                error: e.to_string(),
            }
        }
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= BODY_EXCERPT {
        body.to_string()
    } else {
        let cut: String = body.chars().take(BODY_EXCERPT).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::http::StatusCode;
    use axum::response::Html;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn config(base_url: &str) -> FunnelConfig {
        FunnelConfig {
            base_url: base_url.to_string(),
            timeout_ms: 5_000,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn both_checks_pass_against_a_healthy_server() {
        let bodies = Arc::new(Mutex::new(Vec::<Value>::new()));
        let captured = bodies.clone();
        let app = Router::new()
            .route(
                "/api/v1/tarife/berechnen",
                post(move |Json(body): Json<Value>| {
                    let captured = captured.clone();
                    async move {
                        captured.lock().unwrap().push(body);
                        Json(json!({"status": "success", "daten": [{"id": "A"}, {"id": "B"}]}))
                    }
                }),
            )
            .route("/", get(|| async { Html("<html>funnel</html>") }));
        let url = serve(app).await;

        let report = run_smoke(&config(&url)).await.unwrap();

        assert!(report.all_passed());
        assert_eq!(report.tariff_count, Some(2));
        assert_eq!(
            report.pricing,
            CheckResult::Passed {
                status: 200,
                detail: "2 tariff options".to_string()
            }
        );
        assert_eq!(
            bodies.lock().unwrap()[0],
            json!({"plz": "10115", "jahresverbrauch": 3500, "haushaltgroesse": 2})
        );
    }

    #[tokio::test]
    async fn unreachable_frontend_still_reports_pricing() {
        let app = Router::new().route(
            "/api/v1/tarife/berechnen",
            post(|| async { Json(json!({"erfolg": true, "daten": {"tarife": [{"id": "A"}]}})) }),
        );
        let url = serve(app).await;

        let mut config = config(&url);
        config.site_url = Some("http://127.0.0.1:1".to_string());
        let report = run_smoke(&config).await.unwrap();

        assert!(report.pricing.passed());
        assert_eq!(report.tariff_count, Some(1));
        assert!(matches!(report.frontend, CheckResult::Failed { status: None, .. }));
        assert!(!report.all_passed());
    }

    #[tokio::test]
    async fn pricing_error_status_does_not_skip_frontend() {
        let app = Router::new()
            .route(
                "/api/v1/tarife/berechnen",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/", get(|| async { Html("ok") }));
        let url = serve(app).await;

        let report = run_smoke(&config(&url)).await.unwrap();

        assert_eq!(
            report.pricing,
            CheckResult::Failed {
                status: Some(500),
                error: "boom".to_string()
            }
        );
        assert!(report.frontend.passed());
        assert_eq!(report.tariff_count, None);
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(BODY_EXCERPT + 10);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), BODY_EXCERPT + 1);
    }
}
