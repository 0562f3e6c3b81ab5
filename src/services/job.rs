use crate::models::{ConnectionResult, Credential, Panel, ProbeTarget, ResultRow, TransportErrorKind};
use crate::stores::schedule::Bucket;
use crate::utils::credential_scan::extract_credentials;
use crate::utils::login::candidate_credentials;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct ConnectionAttempt {
    pub credential: Credential,
    pub target: ProbeTarget,
    pub result: Option<ConnectionResult>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobInfo {
    pub auth_attempts: usize,
    pub using_default_login: bool,
    pub unknown_login: bool,
    pub completed_successfully: bool,
}

/// Credential-probing lifecycle of a single panel.
#[derive(Debug, Clone)]
pub struct Job {
    panel: Panel,
    attempts: Vec<ConnectionAttempt>,
    info: JobInfo,
    payload: Option<Vec<u8>>,
    recovered: Vec<Credential>,
    last_index: Option<usize>,
}

impl Job {
    pub fn new(panel: Panel) -> Self {
        let (credentials, using_default_login) = candidate_credentials(&panel.logins);
        let target = panel.target();
        let attempts = credentials
            .into_iter()
            .map(|credential| ConnectionAttempt {
                credential,
                target: target.clone(),
                result: None,
                completed_at: None,
            })
            .collect();
        Self {
            panel,
            attempts,
            info: JobInfo {
                using_default_login,
                ..JobInfo::default()
            },
            payload: None,
            recovered: Vec::new(),
            last_index: None,
        }
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn info(&self) -> JobInfo {
        self.info
    }

    pub fn candidate_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn recovered_credentials(&self) -> &[Credential] {
        &self.recovered
    }

    /// The attempt the next dispatch should run, or None once exhausted.
    pub fn current_attempt(&self) -> Option<&ConnectionAttempt> {
        if self.info.unknown_login {
            return None;
        }
        self.attempts.get(self.info.auth_attempts)
    }

    pub fn last_result(&self) -> Option<&ConnectionResult> {
        self.last_attempt().and_then(|attempt| attempt.result.as_ref())
    }

    pub fn last_attempt(&self) -> Option<&ConnectionAttempt> {
        self.last_index.and_then(|idx| self.attempts.get(idx))
    }

    /// Records the outcome of the current attempt and advances the state
    /// machine. Only an auth rejection moves on to the next credential.
    pub fn handle_result(&mut self, result: ConnectionResult) {
        let idx = self.info.auth_attempts;
        let Some(attempt) = self.attempts.get_mut(idx) else {
            return;
        };
        attempt.result = Some(result.clone());
        attempt.completed_at = Some(Utc::now());
        self.last_index = Some(idx);

        match result {
            ConnectionResult::AuthError { .. } => {
                self.info.auth_attempts += 1;
                if self.info.auth_attempts >= self.attempts.len().saturating_sub(1) {
                    self.info.unknown_login = true;
                }
            }
            ConnectionResult::Success { payload, .. } => {
                self.recovered = extract_credentials(&payload);
                self.payload = Some(payload);
                self.info.completed_successfully = true;
            }
            ConnectionResult::Timeout | ConnectionResult::Error { .. } => {}
        }
    }

    /// Where the job belongs after its latest outcome. None means the job is
    /// dropped: either it never ran or it hit an unclassified transport error.
    pub fn route(&self) -> Option<Bucket> {
        match self.last_result()? {
            ConnectionResult::Success { .. } => Some(Bucket::Success),
            ConnectionResult::AuthError { .. } if self.info.unknown_login => {
                Some(Bucket::UnknownLogin)
            }
            ConnectionResult::AuthError { .. } => Some(Bucket::AuthError),
            ConnectionResult::Timeout => Some(Bucket::TimedOut),
            ConnectionResult::Error { kind, .. } => match kind {
                TransportErrorKind::HostUnreachable => Some(Bucket::HostUnreachable),
                TransportErrorKind::ConnectionRefused => Some(Bucket::ConnectionRefused),
                TransportErrorKind::TimedOut => Some(Bucket::TimedOut),
                TransportErrorKind::Unclassified => None,
            },
        }
    }

    pub fn describe(&self) -> Value {
        serde_json::json!({
            "storage_name": self.panel.storage_name,
            "storage_id": self.panel.storage_id,
            "storage_code": self.panel.storage_code,
            "url": self.panel.url,
            "panel_id": self.panel.panel_id,
        })
    }

    /// Builds the persistence row for the latest outcome. None when the
    /// storage id is not numeric.
    pub fn result_row(&self, run_id: &str) -> Option<ResultRow> {
        let storage_id = self.panel.numeric_storage_id()?;
        let attempt = self.last_attempt();
        let result = attempt.and_then(|a| a.result.as_ref());
        let latency_ms = result.and_then(ConnectionResult::latency_ms);
        let payload = result.and_then(ConnectionResult::payload);

        let blob = serde_json::json!({
            "run_id": run_id,
            "result": result.map(ConnectionResult::tag),
            "error": result.map(ConnectionResult::error_detail).unwrap_or(Value::Null),
            "latency_ms": latency_ms,
            "storage_name": self.panel.storage_name,
            "storage_id": self.panel.storage_id,
            "storage_code": self.panel.storage_code,
            "url": self.panel.url,
            "panel_id": self.panel.panel_id,
            "username": attempt.map(|a| a.credential.username.clone()),
            "auth_attempts": self.info.auth_attempts,
            "using_default_login": self.info.using_default_login,
            "unknown_login": self.info.unknown_login,
            "recovered_login_count": self.recovered.len(),
            "payload_len": payload.map(<[u8]>::len),
            "payload_sha256": payload.map(payload_digest),
        });

        Some(ResultRow {
            storage_id,
            storage_code: self.panel.storage_code.clone(),
            query_time: attempt.and_then(|a| a.completed_at).unwrap_or_else(Utc::now),
            response_bytes: payload.map(<[u8]>::to_vec),
            latency_ms: latency_ms.map(|ms| i32::try_from(ms).unwrap_or(i32::MAX)),
            result: blob,
        })
    }
}

fn payload_digest(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hex::encode(hasher.finalize())
}
