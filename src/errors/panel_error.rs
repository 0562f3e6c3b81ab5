use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelErrorKind {
    Config,
    Database,
    Http,
}

/// Fatal error for the run as a whole. Per-attempt failures never become one
/// of these; they are carried as `ConnectionResult` values instead.
#[derive(Debug, Clone, Serialize)]
pub struct PanelError {
    pub kind: PanelErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl PanelError {
    pub fn new(kind: PanelErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(PanelErrorKind::Config, "CONFIG", message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(PanelErrorKind::Database, "DATABASE", message)
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::new(PanelErrorKind::Http, "HTTP", message)
    }
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hint {
            Some(hint) => write!(f, "{} ({})", self.message, hint),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for PanelError {}

impl From<tokio_postgres::Error> for PanelError {
    fn from(err: tokio_postgres::Error) -> Self {
        PanelError::database(format!("PostgreSQL error: {}", err))
    }
}

impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        PanelError::http(format!("HTTP client error: {}", err))
    }
}

impl From<dotenvy::Error> for PanelError {
    fn from(err: dotenvy::Error) -> Self {
        PanelError::config(format!("Failed to load .env file: {}", err))
    }
}
