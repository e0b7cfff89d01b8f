//! Shared HTTP request primitive for notification sinks.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use tracing::debug;

use crate::error::{NotifyError, Result};

/// Request and connect timeout applied to every sink call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Install the process-wide rustls crypto provider exactly once.
pub(crate) fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Success contract of a sink request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedStatus {
    /// Any 2xx response is a success.
    Any2xx,
    /// Only this exact status is a success.
    Exact(StatusCode),
}

impl ExpectedStatus {
    pub fn matches(self, status: StatusCode) -> bool {
        match self {
            Self::Any2xx => status.is_success(),
            Self::Exact(code) => status == code,
        }
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any2xx => write!(f, "2xx"),
            Self::Exact(code) => write!(f, "{}", code.as_u16()),
        }
    }
}

/// Body shapes the sinks send.
#[derive(Debug)]
pub enum RequestBody {
    /// Serialized as `application/json`.
    Json(serde_json::Value),
    /// Serialized as `application/x-www-form-urlencoded`.
    Form(Vec<(&'static str, String)>),
}

/// HTTP client wrapper enforcing the sink transport policy: bounded
/// timeouts, TLS 1.2 minimum, no redirect following.
#[derive(Clone)]
pub struct HttpSender {
    client: Client,
}

impl HttpSender {
    pub fn new() -> Result<Self> {
        install_rustls_provider();
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_TIMEOUT)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Issue one request and check the response against `expected`.
    ///
    /// A status outside the contract becomes [`NotifyError::HttpStatus`]
    /// carrying the observed code, so the retry classifier can inspect it.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: RequestBody,
        headers: HeaderMap,
        expected: ExpectedStatus,
        operation: &'static str,
    ) -> Result<()> {
        debug!(
            %method,
            url,
            headers = ?redact_headers(&headers),
            operation,
            "sending HTTP request"
        );

        let request = self.client.request(method, url).headers(headers);
        let request = match &body {
            RequestBody::Json(value) => request.json(value),
            RequestBody::Form(pairs) => request.form(pairs),
        };

        let response = request.send().await?;
        let status = response.status();
        let response_body = response.text().await.unwrap_or_default();
        debug!(
            status = status.as_u16(),
            body = %redact_body(&response_body),
            operation,
            "HTTP response received"
        );

        if !expected.matches(status) {
            return Err(NotifyError::http_status(status, url, operation));
        }

        Ok(())
    }
}

/// Sensitive header values must never reach the logs.
fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive_header(name.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[non-ascii]").to_string()
            };
            (name.to_string(), shown)
        })
        .collect()
}

fn is_sensitive_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("x-api-key") || name.eq_ignore_ascii_case("authorization")
}

fn redact_body(content: &str) -> String {
    if content.contains("api_key") || content.contains("token") {
        return "[REDACTED]".to_string();
    }
    if content.len() > 200 {
        return format!("[TRUNCATED_LEN={}]", content.len());
    }
    content.to_string()
}
