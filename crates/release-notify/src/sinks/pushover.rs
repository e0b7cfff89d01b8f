//! Pushover push notification sink.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::json;

use super::NotificationSink;
use crate::error::{NotifyError, Result};
use crate::event::ReleaseEvent;
use crate::http::{ExpectedStatus, HttpSender, RequestBody};

/// Fixed Pushover message endpoint.
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Pushover sink configuration.
#[derive(Debug, Clone, Default)]
pub struct PushoverConfig {
    /// Whether the sink is enabled.
    pub enabled: bool,
    /// Pushover user key.
    pub user_key: String,
    /// Pushover application token.
    pub token: String,
}

/// Pushover notification sink.
pub struct PushoverSink {
    config: PushoverConfig,
    sender: HttpSender,
    endpoint: String,
}

impl PushoverSink {
    pub fn new(config: PushoverConfig, sender: HttpSender) -> Self {
        Self::with_endpoint(config, sender, PUSHOVER_API_URL)
    }

    /// Use a non-default endpoint, e.g. a local mock server.
    pub fn with_endpoint(
        config: PushoverConfig,
        sender: HttpSender,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            config,
            sender,
            endpoint: endpoint.into(),
        }
    }

    /// Build the HTML message body. Every interpolated field is
    /// user-controlled and escaped before embedding.
    fn build_message(&self, event: &ReleaseEvent) -> String {
        format!(
            "<b>{}</b><small>\n<b>Category:</b> {}</small><small>\n<b>Indexer:</b> {}</small><small>\n<b>Size:</b> {}</small>",
            html_escape(event.display_name()),
            html_escape(&event.category),
            html_escape(event.indexer_host()),
            human_size(event.size_bytes),
        )
    }
}

#[async_trait]
impl NotificationSink for PushoverSink {
    fn name(&self) -> &'static str {
        "pushover"
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn check_credentials(&self) -> Result<()> {
        if self.config.user_key.is_empty() || self.config.token.is_empty() {
            return Err(NotifyError::MissingCredentials {
                sink: "pushover",
                vars: &["PUSHOVER_USER_KEY", "PUSHOVER_TOKEN"],
            });
        }
        Ok(())
    }

    async fn send(&self, event: &ReleaseEvent) -> Result<()> {
        let payload = json!({
            "token": self.config.token,
            "user": self.config.user_key,
            "title": format!("{} Downloaded", event.kind),
            "message": self.build_message(event),
            "priority": "-2",
            "html": "1",
        });

        self.sender
            .send(
                Method::POST,
                &self.endpoint,
                RequestBody::Json(payload),
                HeaderMap::new(),
                ExpectedStatus::Exact(StatusCode::OK),
                "pushover notification",
            )
            .await
    }
}

/// Escape HTML-special characters before embedding user-controlled text.
fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Format a byte count with binary prefixes and two-decimal precision,
/// e.g. `1.00 KiB` at exactly 1024 bytes.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
