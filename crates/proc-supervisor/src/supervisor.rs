//! Daemon child process lifecycle: spawn, wait, signal-forward, escalate.
//!
//! The child is spawned as the leader of a fresh process group so one
//! signal reaches the daemon and anything it forked. The supervisor is the
//! only component that signals the child, and reaps it exactly once.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, SupervisorError};

/// Time the daemon gets to exit voluntarily after SIGTERM.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Lifecycle phase of the supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Terminating,
    Exited,
}

/// How a supervised run ended.
#[derive(Debug)]
pub enum Shutdown {
    /// The child exited on its own. The daemon is expected to run
    /// indefinitely, so even a clean exit is noteworthy.
    ChildExited(ExitStatus),
    /// A termination signal arrived and the child exited within the grace
    /// period; carries the child's real exit status.
    SignalStopped(ExitStatus),
}

pub struct Supervisor {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    grace: Duration,
}

impl Supervisor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            grace: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Argument vector forwarded to the daemon (already sanitized).
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Extra environment variables the daemon must see.
    pub fn envs(mut self, envs: Vec<(String, String)>) -> Self {
        self.envs = envs;
        self
    }

    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Run the daemon to completion, racing child exit against `cancel`.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<Shutdown> {
        transition(Phase::Starting);
        let mut child = self.spawn()?;

        // The PID is read once here and doubles as the process-group ID
        // because the child is its group's leader.
        let pgid = match child.id() {
            Some(pid) => pid as i32,
            None => {
                return Err(SupervisorError::Wait {
                    source: std::io::Error::other("child exited before its PID could be read"),
                });
            }
        };

        transition(Phase::Running);
        info!(pid = pgid, program = %self.program.display(), "daemon started");

        let shutdown = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| SupervisorError::Wait { source })?;
                warn!(%status, "daemon exited without a shutdown signal");
                Ok(Shutdown::ChildExited(status))
            }
            _ = cancel.cancelled() => {
                transition(Phase::Terminating);
                info!("termination signal received, stopping daemon");
                self.terminate(child, pgid).await
            }
        };

        transition(Phase::Exited);
        shutdown
    }

    fn spawn(&self) -> Result<Child> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .process_group(0);

        command.spawn().map_err(|source| SupervisorError::Spawn {
            program: self.program.display().to_string(),
            source,
        })
    }

    /// SIGTERM the group, wait out the grace period, escalate to SIGKILL.
    async fn terminate(&self, mut child: Child, pgid: i32) -> Result<Shutdown> {
        signal_group(pgid, Signal::SIGTERM)?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| SupervisorError::Wait { source })?;
                info!(%status, "daemon stopped within the grace period");
                Ok(Shutdown::SignalStopped(status))
            }
            _ = tokio::time::sleep(self.grace) => {
                warn!(grace = ?self.grace, "grace period elapsed, killing process group");
                signal_group(pgid, Signal::SIGKILL)?;
                // Reap the killed child so no zombie outlives the supervisor.
                let _ = child.wait().await;
                Err(SupervisorError::ForcedKill { grace: self.grace })
            }
        }
    }
}

fn signal_group(pgid: i32, signal: Signal) -> Result<()> {
    debug!(pgid, ?signal, "signalling process group");
    killpg(Pid::from_raw(pgid), signal)
        .map_err(|source| SupervisorError::Signal { pgid, source })
}

fn transition(phase: Phase) {
    debug!(?phase, "supervisor phase");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::time::Instant;

    fn sh(script: &str) -> Supervisor {
        Supervisor::new("/bin/sh").args(vec!["-c".to_string(), script.to_string()])
    }

    fn cancel_after(cancel: &CancellationToken, delay: Duration) {
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trigger.cancel();
        });
    }

    #[tokio::test]
    async fn spawn_failure_is_fatal() {
        let supervisor = Supervisor::new("/nonexistent/daemon-binary");
        let err = supervisor.run(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
    }

    #[tokio::test]
    async fn child_exit_is_surfaced_with_its_status() {
        let supervisor = sh("exit 7");
        match supervisor.run(&CancellationToken::new()).await.unwrap() {
            Shutdown::ChildExited(status) => assert_eq!(status.code(), Some(7)),
            other => panic!("expected ChildExited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sigterm_within_grace_returns_the_real_exit_result() {
        let supervisor = sh("sleep 30").grace_period(Duration::from_secs(10));
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(100));

        let start = Instant::now();
        match supervisor.run(&cancel).await.unwrap() {
            Shutdown::SignalStopped(status) => {
                // `sleep` dies from the forwarded SIGTERM.
                assert_eq!(status.signal(), Some(libc_sigterm()));
            }
            other => panic!("expected SignalStopped, got {other:?}"),
        }
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "must not wait out the grace period when the child exits"
        );
    }

    #[tokio::test]
    async fn sigterm_ignoring_child_is_killed_after_the_grace_period() {
        let grace = Duration::from_millis(300);
        let supervisor = sh("trap '' TERM; while true; do sleep 1; done").grace_period(grace);
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(100));

        let start = Instant::now();
        let err = supervisor.run(&cancel).await.unwrap_err();

        assert!(matches!(err, SupervisorError::ForcedKill { .. }));
        assert!(
            start.elapsed() >= Duration::from_millis(100) + grace,
            "SIGKILL must not be issued before the grace period elapses"
        );
    }

    fn libc_sigterm() -> i32 {
        Signal::SIGTERM as i32
    }
}
