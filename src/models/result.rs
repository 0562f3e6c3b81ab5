use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    HostUnreachable,
    ConnectionRefused,
    TimedOut,
    Unclassified,
}

impl TransportErrorKind {
    /// Socket-style code stored in the result blob.
    pub fn code(self) -> &'static str {
        match self {
            TransportErrorKind::HostUnreachable => "EHOSTUNREACH",
            TransportErrorKind::ConnectionRefused => "ECONNREFUSED",
            TransportErrorKind::TimedOut => "ETIMEDOUT",
            TransportErrorKind::Unclassified => "UNKNOWN",
        }
    }
}

/// Outcome of exactly one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionResult {
    Success { payload: Vec<u8>, latency_ms: u64 },
    AuthError { latency_ms: u64 },
    Timeout,
    Error {
        kind: TransportErrorKind,
        message: String,
    },
}

impl ConnectionResult {
    pub fn tag(&self) -> &'static str {
        match self {
            ConnectionResult::Success { .. } => "success",
            ConnectionResult::AuthError { .. } => "autherror",
            ConnectionResult::Timeout => "timeout",
            ConnectionResult::Error { .. } => "error",
        }
    }

    pub fn latency_ms(&self) -> Option<u64> {
        match self {
            ConnectionResult::Success { latency_ms, .. }
            | ConnectionResult::AuthError { latency_ms } => Some(*latency_ms),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            ConnectionResult::Success { payload, .. } => Some(payload.as_slice()),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Value {
        match self {
            ConnectionResult::Error { kind, message } => serde_json::json!({
                "kind": kind,
                "code": kind.code(),
                "message": message,
            }),
            ConnectionResult::Timeout => serde_json::json!({
                "kind": "request_timeout",
                "code": "TIMEOUT",
                "message": "No response before the probe timeout",
            }),
            _ => Value::Null,
        }
    }
}

/// One row destined for the `storage_monitor` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub storage_id: i64,
    pub storage_code: String,
    pub query_time: DateTime<Utc>,
    pub response_bytes: Option<Vec<u8>>,
    pub latency_ms: Option<i32>,
    pub result: Value,
}
