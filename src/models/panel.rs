use crate::constants::{network as network_constants, probe as probe_constants};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// One row of the monitor list: a device endpoint plus the logins on file for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub storage_name: String,
    pub storage_id: String,
    pub storage_code: String,
    pub url: String,
    #[serde(default)]
    pub logins: Vec<String>,
    pub panel_id: i32,
}

impl Panel {
    /// `storage_id` is stored as text upstream but written back as a number.
    pub fn numeric_storage_id(&self) -> Option<i64> {
        self.storage_id.trim().parse::<i64>().ok()
    }

    pub fn target(&self) -> ProbeTarget {
        ProbeTarget::from_authority(&self.url)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Where a probe goes: `host:port` from the panel record plus the fixed
/// telemetry query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: Option<String>,
    pub path: String,
}

impl ProbeTarget {
    pub fn from_authority(raw: &str) -> Self {
        let raw = raw.trim();
        let (host, port) = match raw.split_once(':') {
            Some((host, port)) => (host.to_string(), Some(port.to_string())),
            None => (raw.to_string(), None),
        };
        Self {
            host,
            port,
            path: format!(
                "/{}?{}",
                probe_constants::TELEMETRY_PATH,
                probe_constants::TELEMETRY_QUERY
            ),
        }
    }

    pub fn port_number(&self) -> Result<u16, String> {
        match self.port.as_deref() {
            None | Some("") => Ok(network_constants::HTTP_DEFAULT_PORT),
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| format!("Invalid port '{}'", raw)),
        }
    }

    pub fn url(&self) -> Result<Url, String> {
        if self.host.is_empty() {
            return Err("Panel url has no host".to_string());
        }
        let port = self.port_number()?;
        Url::parse(&format!("http://{}:{}{}", self.host, port, self.path))
            .map_err(|err| format!("Invalid panel url: {}", err))
    }
}
