//! Environment-driven notifier configuration.
//!
//! Loaded once at startup and treated as read-only for the remainder of the
//! process; every component receives it by value or reference instead of
//! consulting globals.

use reqwest::StatusCode;
use tracing::warn;

use crate::http::ExpectedStatus;
use crate::sinks::{CrossSeedConfig, PushoverConfig};

/// All sink configuration for one notifier run.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub pushover: PushoverConfig,
    pub cross_seed: CrossSeedConfig,
}

impl NotifyConfig {
    /// Read the `PUSHOVER_*` and `CROSS_SEED_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            pushover: PushoverConfig {
                enabled: env_bool("PUSHOVER_ENABLED"),
                user_key: env_string("PUSHOVER_USER_KEY"),
                token: env_string("PUSHOVER_TOKEN"),
            },
            cross_seed: CrossSeedConfig {
                enabled: env_bool("CROSS_SEED_ENABLED"),
                url: env_string("CROSS_SEED_URL"),
                api_key: env_string("CROSS_SEED_API_KEY"),
                expect_status: parse_expect_status(
                    "CROSS_SEED_EXPECT_STATUS",
                    std::env::var("CROSS_SEED_EXPECT_STATUS").ok(),
                ),
            },
        }
    }
}

fn env_string(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

fn env_bool(key: &str) -> bool {
    parse_bool(std::env::var(key).ok())
}

/// Boolean variables are the literal `true`, case-insensitive; anything
/// else (including absence) is `false`.
fn parse_bool(raw: Option<String>) -> bool {
    raw.map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Optional exact-status override for a sink; defaults to any-2xx.
fn parse_expect_status(key: &str, raw: Option<String>) -> ExpectedStatus {
    let Some(raw) = raw else {
        return ExpectedStatus::Any2xx;
    };
    match raw.trim().parse::<u16>().ok().and_then(|code| StatusCode::from_u16(code).ok()) {
        Some(code) => ExpectedStatus::Exact(code),
        None => {
            warn!(var = key, value = %raw, "not a valid HTTP status, using the 2xx default");
            ExpectedStatus::Any2xx
        }
    }
}
