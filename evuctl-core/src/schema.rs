//! Schema probe: infer whether a column exists by inserting a synthetic row
//! through the managed backend's REST API.
//!
//! No DDL is issued and the inserted row is left in place.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::unique_test_email;
use crate::error::{ProbeError, Result};

/// Postgres: relation does not exist
pub const RELATION_MISSING: &str = "42P01";
/// Postgres: column does not exist
pub const COLUMN_MISSING: &str = "42703";
/// PostgREST: table not in schema cache
pub const REST_TABLE_MISSING: &str = "PGRST205";
/// PostgREST: column not in schema cache
pub const REST_COLUMN_MISSING: &str = "PGRST204";

/// Error object returned by the managed backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

/// `{data, error}` pair, as the managed client libraries present it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsertResponse {
    pub status: u16,
    pub data: Option<Value>,
    pub error: Option<BackendError>,
}

#[async_trait]
pub trait ManagedBackend: Send + Sync {
    async fn insert(&self, table: &str, row: &Value) -> Result<InsertResponse>;
}

/// PostgREST-style endpoint at `<url>/rest/v1/<table>`.
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::http("building HTTP client", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ManagedBackend for RestBackend {
    async fn insert(&self, table: &str, row: &Value) -> Result<InsertResponse> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        debug!(url = %url, "insert");

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(|e| ProbeError::http(format!("insert into {table}"), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::http(format!("reading insert response for {table}"), e))?;

        if status.is_success() {
            let data = if body.trim().is_empty() {
                None
            } else {
                let data = serde_json::from_str(&body).map_err(|e| {
                    ProbeError::json("insert response", status.as_u16(), body.as_str(), e)
                })?;
                Some(data)
            };
            return Ok(InsertResponse {
                status: status.as_u16(),
                data,
                error: None,
            });
        }

        let error = serde_json::from_str::<BackendError>(&body).unwrap_or_else(|_| BackendError {
            code: None,
            message: body.clone(),
            ..Default::default()
        });
        Ok(InsertResponse {
            status: status.as_u16(),
            data: None,
            error: Some(error),
        })
    }
}

/// Synthetic customer-like row; only used to provoke a schema signal.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub consent: bool,
}

impl ProbeRecord {
    pub fn synthetic(email_domain: &str) -> Self {
        Self {
            email: unique_test_email(email_domain),
            first_name: "Schema".to_string(),
            last_name: "Probe".to_string(),
            consent: true,
        }
    }

    /// Row with the consent flag stored under `column`
    pub fn to_row(&self, column: &str) -> Value {
        let mut row = json!({
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
        });
        row[column] = Value::Bool(self.consent);
        row
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SchemaVerdict {
    TableMissing { code: String, message: String },
    ColumnMissing { code: String, message: String },
    OtherError { code: Option<String>, message: String },
    ColumnExists,
    Inconclusive,
}

impl SchemaVerdict {
    pub fn is_column_present(&self) -> bool {
        matches!(self, Self::ColumnExists)
    }
}

/// Classify an insert outcome.
///
/// Known codes decide first. Without a code the message is inspected; a
/// message naming a column is a column problem, a bare missing relation is a
/// table problem.
pub fn classify(response: &InsertResponse) -> SchemaVerdict {
    let Some(error) = &response.error else {
        return match &response.data {
            Some(Value::Null) | None => SchemaVerdict::Inconclusive,
            Some(_) => SchemaVerdict::ColumnExists,
        };
    };

    let code = error.code.clone().unwrap_or_default();
    let message = error.message.clone();
    let lower = message.to_lowercase();
    let missing = lower.contains("does not exist") || lower.contains("could not find");

    match code.as_str() {
        RELATION_MISSING | REST_TABLE_MISSING => SchemaVerdict::TableMissing { code, message },
        COLUMN_MISSING | REST_COLUMN_MISSING => SchemaVerdict::ColumnMissing { code, message },
        "" if missing && lower.contains("column") => SchemaVerdict::ColumnMissing { code, message },
        "" if missing && (lower.contains("relation") || lower.contains("table")) => {
            SchemaVerdict::TableMissing { code, message }
        }
        _ => SchemaVerdict::OtherError {
            code: error.code.clone(),
            message,
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub table: String,
    pub column: String,
    pub email: String,
    pub response: InsertResponse,
    pub verdict: SchemaVerdict,
}

/// Insert `record` into `table` with the consent flag under `column` and
/// classify the result.
pub async fn probe_schema<B>(
    backend: &B,
    table: &str,
    column: &str,
    record: &ProbeRecord,
) -> Result<SchemaReport>
where
    B: ManagedBackend + ?Sized,
{
    let row = record.to_row(column);
    let response = backend.insert(table, &row).await?;
    let verdict = classify(&response);

    match &verdict {
        SchemaVerdict::ColumnExists => info!(table, column, "column exists, insert succeeded"),
        SchemaVerdict::Inconclusive => {
            warn!(table, column, "insert returned neither data nor error")
        }
        other => warn!(table, column, verdict = ?other, "insert rejected"),
    }

    Ok(SchemaReport {
        table: table.to_string(),
        column: column.to_string(),
        email: record.email.clone(),
        response,
        verdict,
    })
}
