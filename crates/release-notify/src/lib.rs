//! Release event validation and notification sink dispatch.
//!
//! This crate implements the "release downloaded" side of the container
//! entrypoint suite: a typed, atomically validated [`ReleaseEvent`], a
//! token-bucket [`RateLimiter`] shared across sink calls, a bounded
//! [`retry`] engine with error classification, and the Pushover and
//! cross-seed [`sinks`].

pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod rate_limit;
pub mod retry;
pub mod service;
pub mod sinks;

pub use config::NotifyConfig;
pub use error::{NotifyError, Result};
pub use event::ReleaseEvent;
pub use http::{ExpectedStatus, HttpSender};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{RetryPolicy, retry};
pub use service::NotifierService;
