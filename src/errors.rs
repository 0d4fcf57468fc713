// errors.rs
use thiserror::Error;

/// Errors originating from either the backend bindings
/// (REST, SQLite) or the service layer (decode, validation).
#[derive(Debug, Error)]
pub enum MillError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Non-success HTTP status that is not a permission failure.
    #[error("Backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Database Error: {0}")]
    DbError(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: f64, requested: f64 },

    #[error("Config error: {0}")]
    Config(String),

    #[error("{failed} of {attempted} deletions failed")]
    PartialFailure { failed: usize, attempted: usize },

    #[error("XLSX error: {0}")]
    XlsxError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const PERMISSION_HINT: &str = "Check the database security rules for this path, \
or set MILLBOOK_AUTH_TOKEN to a token that is allowed to read and write it.";

impl MillError {
    pub fn invalid(id: &str, reason: impl Into<String>) -> Self {
        MillError::InvalidRecord {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            MillError::Network(_) => true,
            // 429 is quota, 5xx is the service.
            MillError::Backend { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// A one-line hint printed next to the error by the CLI.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            MillError::PermissionDenied(_) => Some(PERMISSION_HINT),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for MillError {
    fn from(e: rusqlite::Error) -> Self {
        MillError::DbError(e.to_string())
    }
}

impl From<serde_json::Error> for MillError {
    fn from(e: serde_json::Error) -> Self {
        MillError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for MillError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => MillError::Backend {
                status: status.as_u16(),
                body: e.to_string(),
            },
            None => MillError::Network(e.to_string()),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for MillError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        MillError::XlsxError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_and_server_errors_are_transient() {
        assert!(MillError::Network("reset".into()).is_transient());
        assert!(MillError::Backend {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(MillError::Backend {
            status: 429,
            body: String::new()
        }
        .is_transient());
    }

    #[test]
    fn permission_errors_are_permanent_with_hint() {
        let err = MillError::PermissionDenied("workers".into());
        assert!(!err.is_transient());
        assert!(err.remediation().is_some());
        assert!(MillError::NotFound("x".into()).remediation().is_none());
    }
}
