//! Notification sinks.
//!
//! This module provides the destinations a validated release event is
//! dispatched to:
//! - Pushover push notifications
//! - cross-seed webhook searches

mod cross_seed;
mod pushover;

pub use cross_seed::{CrossSeedConfig, CrossSeedSink};
pub use pushover::{PUSHOVER_API_URL, PushoverConfig, PushoverSink};

use async_trait::async_trait;

use crate::error::Result;
use crate::event::ReleaseEvent;

/// A destination for validated release events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short sink name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the sink is switched on in configuration.
    fn is_enabled(&self) -> bool;

    /// Verify that every credential the sink needs is present.
    fn check_credentials(&self) -> Result<()>;

    /// Deliver one release event.
    async fn send(&self, event: &ReleaseEvent) -> Result<()>;
}
