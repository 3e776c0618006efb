//! Tariff funnel HTTP API: payloads and a thin JSON client.
//!
//! The funnel backend is not consistent about field names across versions
//! (`status` vs `erfolg`, `daten` as list vs object), so the response types
//! accept both shapes.

use std::time::Duration;

use chrono::{Days, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ProbeError, Result};

/// Raw HTTP answer: status plus body text.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| ProbeError::json(context, self.status, self.body.as_str(), e))
    }
}

/// JSON client bound to one base URL.
#[derive(Debug, Clone)]
pub struct FunnelClient {
    client: Client,
    base_url: String,
}

impl FunnelClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::http("building HTTP client", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        if path.is_empty() || path == "/" {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ApiResponse> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ProbeError::http(format!("POST {url}"), e))?;
        Self::read(response, &url).await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeError::http(format!("GET {url}"), e))?;
        Self::read(response, &url).await
    }

    async fn read(response: reqwest::Response, url: &str) -> Result<ApiResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::http(format!("reading body of {url}"), e))?;
        debug!(url = %url, status, bytes = body.len(), "response");
        Ok(ApiResponse { status, body })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricingRequest {
    pub plz: String,
    pub jahresverbrauch: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub haushaltgroesse: Option<u32>,
    #[serde(rename = "funnelId", skip_serializing_if = "Option::is_none")]
    pub funnel_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PricingResponse {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub erfolg: Option<bool>,
    #[serde(default)]
    pub daten: Option<Value>,
}

impl PricingResponse {
    /// `erfolg: true`, or a `status` of `true` / "success" / "ok"
    pub fn is_success(&self) -> bool {
        if let Some(erfolg) = self.erfolg {
            return erfolg;
        }
        match &self.status {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "success" | "ok"),
            _ => false,
        }
    }

    fn tariff_values(&self) -> &[Value] {
        match &self.daten {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Object(map)) => match map.get("tarife") {
                Some(Value::Array(items)) => items.as_slice(),
                _ => &[],
            },
            _ => &[],
        }
    }

    /// Number of tariff options in `daten`
    pub fn tariff_count(&self) -> usize {
        self.tariff_values().len()
    }

    /// Tariffs that parse; malformed entries are skipped
    pub fn tariffs(&self) -> Vec<Tariff> {
        self.tariff_values()
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Tariff {
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kosten: Option<Kosten>,
}

impl Tariff {
    /// Identifier as a string; numeric ids are stringified
    pub fn id_string(&self) -> Option<String> {
        value_to_id(&self.id)
    }

    pub fn monthly_cost(&self) -> Option<f64> {
        self.kosten.as_ref().and_then(|k| k.monatliche_kosten)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Kosten {
    #[serde(default)]
    pub monatliche_kosten: Option<f64>,
    #[serde(default)]
    pub jaehrliche_kosten: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub customer: ImportCustomer,
    pub contract: ImportContract,
    pub meter_location: MeterLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportCustomer {
    pub salutation: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportContract {
    pub tariff_id: String,
    pub funnel_id: String,
    pub start_date: String,
    pub annual_consumption: u32,
    pub postal_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeterLocation {
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub city: String,
    pub meter_number: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub contract_id: Option<Value>,
    #[serde(default)]
    pub draft_id: Option<Value>,
}

impl ImportResponse {
    pub fn contract_id(&self) -> Option<String> {
        self.contract_id.as_ref().and_then(value_to_id)
    }

    pub fn draft_id(&self) -> Option<String> {
        self.draft_id.as_ref().and_then(value_to_id)
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fresh address per call, so repeated runs never hit the unique
/// constraint on customer email.
pub fn unique_test_email(domain: &str) -> String {
    format!(
        "evuctl-test-{}-{}@{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        domain
    )
}

/// Synthetic meter number, unique per call
pub fn test_meter_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TEST{}", &id[..12])
}

/// Contract start date a month out, `YYYY-MM-DD`
pub fn default_start_date() -> String {
    let today = Utc::now().date_naive();
    today
        .checked_add_days(Days::new(30))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}
