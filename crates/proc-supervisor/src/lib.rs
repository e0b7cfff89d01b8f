//! Daemon supervision for the container entrypoint.
//!
//! This crate owns everything between "the container started" and "the
//! daemon is running": idempotent environment [`bootstrap`], the allow-list
//! argument [`sanitizer`](args), and the process-group
//! [`Supervisor`](supervisor::Supervisor) with its graceful-then-forceful
//! shutdown escalation.

pub mod args;
pub mod bootstrap;
pub mod error;
pub mod supervisor;

pub use args::sanitize_args;
pub use bootstrap::Bootstrap;
pub use error::{Result, SupervisorError};
pub use supervisor::{DEFAULT_GRACE_PERIOD, Phase, Shutdown, Supervisor};
