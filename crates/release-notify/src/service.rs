//! Sequential sink dispatch with rate limiting and bounded retries.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::NotifyConfig;
use crate::error::Result;
use crate::event::ReleaseEvent;
use crate::http::HttpSender;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryPolicy, retry};
use crate::sinks::{CrossSeedSink, NotificationSink, PushoverSink};

/// Drives one release event through every configured sink.
///
/// Sinks run sequentially; each dispatch independently takes a token from
/// the shared rate limiter and is retried under the shared policy. One
/// sink's failure never aborts its siblings.
pub struct NotifierService {
    sinks: Vec<Box<dyn NotificationSink>>,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl NotifierService {
    pub fn new(config: NotifyConfig) -> Result<Self> {
        let sender = HttpSender::new()?;
        let sinks: Vec<Box<dyn NotificationSink>> = vec![
            Box::new(PushoverSink::new(config.pushover, sender.clone())),
            Box::new(CrossSeedSink::new(config.cross_seed, sender)),
        ];
        Ok(Self::with_parts(
            sinks,
            RateLimiter::default(),
            RetryPolicy::default(),
        ))
    }

    /// Assemble a service from explicit parts. Used by tests to inject
    /// sinks with non-default endpoints and faster timings.
    pub fn with_parts(
        sinks: Vec<Box<dyn NotificationSink>>,
        limiter: RateLimiter,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            sinks,
            limiter,
            policy,
        }
    }

    /// Dispatch one event; returns the number of successful deliveries.
    pub async fn dispatch(&mut self, event: &ReleaseEvent, cancel: &CancellationToken) -> usize {
        let mut delivered = 0;

        for sink in &self.sinks {
            if !sink.is_enabled() {
                debug!(sink = sink.name(), "sink disabled, skipping");
                continue;
            }

            if let Err(err) = sink.check_credentials() {
                error!(sink = sink.name(), error = %err, "sink misconfigured, skipping");
                continue;
            }

            if let Err(err) = self.limiter.acquire(cancel).await {
                warn!(sink = sink.name(), error = %err, "rate limiter wait aborted, skipping sink");
                continue;
            }

            match retry(&self.policy, cancel, |_| sink.send(event)).await {
                Ok(()) => {
                    info!(sink = sink.name(), "release event delivered");
                    delivered += 1;
                }
                Err(err) => {
                    error!(sink = sink.name(), error = %err, "sink dispatch failed");
                }
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use async_trait::async_trait;

    struct StubSink {
        enabled: bool,
        credentials_ok: bool,
        fail_with: Option<fn() -> NotifyError>,
    }

    impl StubSink {
        fn new(enabled: bool, credentials_ok: bool) -> Self {
            Self {
                enabled,
                credentials_ok,
                fail_with: None,
            }
        }
    }

    #[async_trait]
    impl NotificationSink for StubSink {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn check_credentials(&self) -> Result<()> {
            if self.credentials_ok {
                Ok(())
            } else {
                Err(NotifyError::MissingCredentials {
                    sink: "stub",
                    vars: &["STUB_KEY"],
                })
            }
        }

        async fn send(&self, _event: &ReleaseEvent) -> Result<()> {
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    fn event() -> ReleaseEvent {
        ReleaseEvent::from_args(&[
            "name".to_string(),
            "aabbccddeeff00112233445566778899aabbccdd".to_string(),
            "tv".to_string(),
            "1".to_string(),
            "https://indexer.example/".to_string(),
        ])
        .unwrap()
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_delay: std::time::Duration::from_millis(1),
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn disabled_sinks_are_never_called() {
        let mut service = NotifierService::with_parts(
            vec![Box::new(StubSink::new(false, true))],
            RateLimiter::default(),
            fast_policy(),
        );
        let delivered = service.dispatch(&event(), &CancellationToken::new()).await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn missing_credentials_skip_one_sink_only() {
        let broken = Box::new(StubSink::new(true, false));
        let healthy = Box::new(StubSink::new(true, true));
        let mut service = NotifierService::with_parts(
            vec![broken, healthy],
            RateLimiter::default(),
            fast_policy(),
        );

        let delivered = service.dispatch(&event(), &CancellationToken::new()).await;
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn failing_sink_does_not_abort_the_sibling() {
        let mut failing = StubSink::new(true, true);
        failing.fail_with = Some(|| {
            NotifyError::http_status(
                reqwest::StatusCode::BAD_REQUEST,
                "https://example.com",
                "test",
            )
        });
        let mut service = NotifierService::with_parts(
            vec![Box::new(failing), Box::new(StubSink::new(true, true))],
            RateLimiter::default(),
            fast_policy(),
        );

        let delivered = service.dispatch(&event(), &CancellationToken::new()).await;
        assert_eq!(delivered, 1);
    }
}
