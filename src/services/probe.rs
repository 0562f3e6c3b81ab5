use crate::errors::PanelError;
use crate::models::{ConnectionResult, Credential, ProbeTarget, TransportErrorKind};
use crate::services::logger::Logger;
use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONNECTION};
use reqwest::Client;
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

const EHOSTUNREACH: i32 = 113;

/// One authenticated request against one panel. Implementations must fold
/// every failure into the returned `ConnectionResult`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &ProbeTarget, credential: &Credential) -> ConnectionResult;
}

#[derive(Clone)]
pub struct HttpProber {
    logger: Logger,
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(logger: Logger, timeout_ms: u64) -> Result<Self, PanelError> {
        // Binding the local side to 0.0.0.0 keeps every connection on IPv4.
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .local_address(Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))
            .http1_only()
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            logger: logger.child("probe"),
            client,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &ProbeTarget, credential: &Credential) -> ConnectionResult {
        let url = match target.url() {
            Ok(url) => url,
            Err(message) => {
                return ConnectionResult::Error {
                    kind: TransportErrorKind::Unclassified,
                    message,
                }
            }
        };
        self.logger.debug(
            "probe",
            Some(&serde_json::json!({"host": target.host, "username": credential.username})),
        );

        let request = self
            .client
            .get(url)
            .header(AUTHORIZATION, basic_auth_value(credential))
            .timeout(self.timeout);

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return classify_request_error(&err),
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        if signals_auth_rejection(response.headers()) {
            return ConnectionResult::AuthError { latency_ms };
        }

        let mut payload = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => payload.extend_from_slice(&chunk),
                Err(err) => return classify_request_error(&err),
            }
        }
        ConnectionResult::Success {
            payload,
            latency_ms,
        }
    }
}

pub fn basic_auth_value(credential: &Credential) -> HeaderValue {
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", credential.username, credential.password));
    let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
        .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
    value.set_sensitive(true);
    value
}

/// Panels reject a login by answering with `Connection: close`.
pub fn signals_auth_rejection(headers: &HeaderMap) -> bool {
    headers.get_all(CONNECTION).iter().any(|value| {
        value
            .to_str()
            .map(|raw| raw.split(',').any(|token| token.trim().eq_ignore_ascii_case("close")))
            .unwrap_or(false)
    })
}

fn classify_request_error(err: &reqwest::Error) -> ConnectionResult {
    if err.is_timeout() {
        return ConnectionResult::Timeout;
    }
    ConnectionResult::Error {
        kind: transport_error_kind(err),
        message: error_chain_message(err),
    }
}

/// Walks the source chain down to the socket error, if there is one.
pub fn transport_error_kind(err: &(dyn Error + 'static)) -> TransportErrorKind {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return match io.kind() {
                std::io::ErrorKind::ConnectionRefused => TransportErrorKind::ConnectionRefused,
                std::io::ErrorKind::HostUnreachable => TransportErrorKind::HostUnreachable,
                std::io::ErrorKind::TimedOut => TransportErrorKind::TimedOut,
                _ if io.raw_os_error() == Some(EHOSTUNREACH) => TransportErrorKind::HostUnreachable,
                _ => TransportErrorKind::Unclassified,
            };
        }
        current = err.source();
    }
    TransportErrorKind::Unclassified
}

fn error_chain_message(err: &(dyn Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        let text = source.to_string();
        if !parts.contains(&text) {
            parts.push(text);
        }
        current = source.source();
    }
    parts.join(": ")
}
