//! cross-seed webhook search sink.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::NotificationSink;
use crate::error::{NotifyError, Result};
use crate::event::ReleaseEvent;
use crate::http::{ExpectedStatus, HttpSender, RequestBody};

/// Fixed webhook sub-path appended to the configured base URL.
pub const WEBHOOK_PATH: &str = "/api/webhook";

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// cross-seed sink configuration.
#[derive(Debug, Clone)]
pub struct CrossSeedConfig {
    /// Whether the sink is enabled.
    pub enabled: bool,
    /// Base URL of the cross-seed instance.
    pub url: String,
    /// API key sent with every webhook call.
    pub api_key: String,
    /// Success contract of the webhook. The upstream service has answered
    /// both 200 and 204 across releases, so the default accepts any 2xx.
    pub expect_status: ExpectedStatus,
}

impl Default for CrossSeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key: String::new(),
            expect_status: ExpectedStatus::Any2xx,
        }
    }
}

/// cross-seed webhook search sink.
pub struct CrossSeedSink {
    config: CrossSeedConfig,
    sender: HttpSender,
}

impl CrossSeedSink {
    pub fn new(config: CrossSeedConfig, sender: HttpSender) -> Self {
        Self { config, sender }
    }

    /// Join the configured base URL with [`WEBHOOK_PATH`].
    ///
    /// Rejects non-HTTP schemes, missing hosts, `..` path segments and
    /// redundant slashes, and drops any query or fragment from the base.
    fn build_webhook_url(base: &str) -> Result<Url> {
        let base_url =
            Url::parse(base).map_err(|e| NotifyError::invalid_url(base, e.to_string()))?;

        match base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(NotifyError::invalid_url(
                    base,
                    format!("unsupported scheme `{other}`"),
                ));
            }
        }
        if base_url.host_str().is_none() {
            return Err(NotifyError::invalid_url(base, "missing host"));
        }

        let path = format!("{}{}", base_url.path().trim_end_matches('/'), WEBHOOK_PATH);
        if path.split('/').any(|segment| segment == "..") || path.contains("//") {
            return Err(NotifyError::invalid_url(
                base,
                "path contains traversal or redundant slashes",
            ));
        }

        let mut url = base_url;
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

#[async_trait]
impl NotificationSink for CrossSeedSink {
    fn name(&self) -> &'static str {
        "cross-seed"
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn check_credentials(&self) -> Result<()> {
        if self.config.url.is_empty() || self.config.api_key.is_empty() {
            return Err(NotifyError::MissingCredentials {
                sink: "cross-seed",
                vars: &["CROSS_SEED_URL", "CROSS_SEED_API_KEY"],
            });
        }
        Ok(())
    }

    async fn send(&self, event: &ReleaseEvent) -> Result<()> {
        let url = Self::build_webhook_url(&self.config.url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&self.config.api_key).map_err(|_| {
                NotifyError::validation("api_key", "not a valid header value")
            })?,
        );

        let form = vec![
            ("infoHash", event.info_hash.clone()),
            ("includeSingleEpisodes", "true".to_string()),
        ];

        self.sender
            .send(
                Method::POST,
                url.as_str(),
                RequestBody::Form(form),
                headers,
                self.config.expect_status,
                "cross-seed search",
            )
            .await
    }
}
