/// Structured error types for evuctl-core probes.
///
/// Uses `thiserror` so the CLI can match on failure kinds, while the binary
/// itself wraps these in `anyhow` for context.
use std::io;
use thiserror::Error;

/// Main error type for evuctl-core operations
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// A credential that must come from the environment is absent
    #[error("Missing secret: set {var} in the environment or an .env file")]
    MissingSecret { var: String },

    /// Transport-level HTTP failure (connect refused, DNS, TLS, timeout)
    #[error("HTTP request failed ({context}): {source}")]
    Http {
        context: String,
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("{context} returned HTTP {status}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    /// API answered 2xx but reported failure in its payload
    #[error("{step} step rejected by API")]
    Rejected { step: String, body: String },

    /// Response body could not be decoded; status and raw body are kept
    #[error("JSON error at {context} (HTTP {status}): {source}")]
    Json {
        context: String,
        status: u16,
        body: String,
        source: serde_json::Error,
    },

    /// Config file is not valid TOML
    #[error("Invalid config file: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// An attempt exceeded its time budget
    #[error("timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// Postgres driver error
    #[error("{source}")]
    Database {
        #[from]
        source: sqlx::Error,
    },
}

/// Result type alias for evuctl-core operations
pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a missing secret error
    pub fn missing_secret(var: impl Into<String>) -> Self {
        Self::MissingSecret { var: var.into() }
    }

    /// Create an HTTP transport error with context
    pub fn http(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            context: context.into(),
            source,
        }
    }

    /// Create a non-success status error
    pub fn status(context: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            context: context.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a payload-level rejection error
    pub fn rejected(step: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Rejected {
            step: step.into(),
            body: body.into(),
        }
    }

    /// Create a decode error for a response body
    pub fn json(
        context: impl Into<String>,
        status: u16,
        body: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            context: context.into(),
            status,
            body: body.into(),
            source,
        }
    }

    /// HTTP status attached to this error, if the server answered at all
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Json { status, .. } => Some(*status),
            Self::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Response body attached to this error, if any
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } | Self::Rejected { body, .. } | Self::Json { body, .. } => {
                Some(body.as_str())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProbeError::missing_secret("EVU_DB_PASSWORD");
        assert_eq!(
            err.to_string(),
            "Missing secret: set EVU_DB_PASSWORD in the environment or an .env file"
        );

        let err = ProbeError::status("contract import", 422, "{\"success\":false}");
        assert_eq!(err.to_string(), "contract import returned HTTP 422");
        assert_eq!(err.http_status(), Some(422));
        assert_eq!(err.response_body(), Some("{\"success\":false}"));
    }

    #[test]
    fn test_rejected_carries_body_without_status() {
        let err = ProbeError::rejected("pricing", "{\"erfolg\":false}");
        assert_eq!(err.http_status(), None);
        assert_eq!(err.response_body(), Some("{\"erfolg\":false}"));
    }

    #[test]
    fn test_decode_error_keeps_status_and_body() {
        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err = ProbeError::json("pricing response", 200, "<html>", source);

        assert!(err.to_string().starts_with("JSON error at pricing response (HTTP 200)"));
        assert_eq!(err.http_status(), Some(200));
        assert_eq!(err.response_body(), Some("<html>"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ProbeError = io_err.into();

        assert!(matches!(err, ProbeError::Io { .. }));
        assert!(err.response_body().is_none());
    }
}
