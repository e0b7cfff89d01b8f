use std::path::PathBuf;
use std::time::Duration;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, SupervisorError>;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to wait for the daemon: {source}")]
    Wait { source: std::io::Error },

    #[error("failed to signal process group {pgid}: {source}")]
    Signal { pgid: i32, source: nix::Error },

    #[error("daemon ignored SIGTERM for {grace:?}, process group killed")]
    ForcedKill { grace: Duration },

    #[error("{operation} failed for {path}: {source}")]
    Bootstrap {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}
