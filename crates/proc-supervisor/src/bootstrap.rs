//! Idempotent environment preparation run once before supervision.
//!
//! Everything here is mechanical I/O: render the default daemon
//! configuration if none exists, point the daemon's log file at the
//! container's stdout, and resolve the port environment mapping. Re-running
//! any of it is a no-op.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, SupervisorError};

pub const DEFAULT_CONFIG_PATH: &str = "/config/qBittorrent/qBittorrent.conf";
pub const DEFAULT_LOG_PATH: &str = "/config/qBittorrent/logs/qbittorrent.log";

const STDOUT_TARGET: &str = "/proc/self/fd/1";
const DEFAULT_WEBUI_PORT: &str = "8080";
const DEFAULT_BT_PORT: &str = "6881";

pub struct Bootstrap {
    config_path: PathBuf,
    log_path: PathBuf,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::with_paths(DEFAULT_CONFIG_PATH, DEFAULT_LOG_PATH)
    }

    pub fn with_paths(config_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            log_path: log_path.into(),
        }
    }

    /// Environment pairs the daemon must see. Applied to the child process
    /// explicitly instead of mutating this process's environment.
    pub fn child_env(&self) -> Vec<(String, String)> {
        vec![
            (
                "QBT_WEBUI_PORT".to_string(),
                env_or("QBITTORRENT__PORT", DEFAULT_WEBUI_PORT),
            ),
            (
                "QBT_TORRENTING_PORT".to_string(),
                env_or("QBITTORRENT__BT_PORT", DEFAULT_BT_PORT),
            ),
        ]
    }

    pub fn prepare(&self) -> Result<()> {
        self.ensure_config_file()?;
        self.ensure_log_symlink()?;
        Ok(())
    }

    fn ensure_config_file(&self) -> Result<()> {
        if self.config_path.exists() {
            info!(path = %self.config_path.display(), "configuration file already exists, leaving untouched");
            return Ok(());
        }

        info!(path = %self.config_path.display(), "writing default configuration");
        ensure_parent_dir(&self.config_path)?;
        std::fs::write(&self.config_path, render_default_config()).map_err(|source| {
            SupervisorError::Bootstrap {
                operation: "writing default configuration",
                path: self.config_path.clone(),
                source,
            }
        })
    }

    fn ensure_log_symlink(&self) -> Result<()> {
        // symlink_metadata treats a dangling symlink as present, which is
        // what idempotency needs here.
        if self.log_path.symlink_metadata().is_ok() {
            debug!(path = %self.log_path.display(), "log path already present");
            return Ok(());
        }

        info!(path = %self.log_path.display(), "linking daemon log to stdout");
        ensure_parent_dir(&self.log_path)?;
        std::os::unix::fs::symlink(STDOUT_TARGET, &self.log_path).map_err(|source| {
            SupervisorError::Bootstrap {
                operation: "creating log symlink",
                path: self.log_path.clone(),
                source,
            }
        })
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    std::fs::create_dir_all(parent).map_err(|source| SupervisorError::Bootstrap {
        operation: "creating parent directory",
        path: parent.to_path_buf(),
        source,
    })
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn render_default_config() -> String {
    format!(
        "[AutoRun]\n\
         enabled=false\n\
         program=\n\
         \n\
         [LegalNotice]\n\
         Accepted=true\n\
         \n\
         [BitTorrent]\n\
         Session\\AsyncIOThreadsCount=10\n\
         Session\\DiskCacheSize=-1\n\
         Session\\DiskIOReadMode=DisableOSCache\n\
         Session\\DiskIOType=SimplePreadPwrite\n\
         Session\\DiskIOWriteMode=EnableOSCache\n\
         Session\\DiskQueueSize=4194304\n\
         Session\\FilePoolSize=40\n\
         Session\\HashingThreadsCount=2\n\
         Session\\ResumeDataStorageType=SQLite\n\
         Session\\UseOSCache=true\n\
         \n\
         [Preferences]\n\
         Connection\\PortRangeMin={port_range_min}\n\
         Connection\\UPnP={upnp}\n\
         General\\Locale={locale}\n\
         General\\UseRandomPort={use_random_port}\n\
         WebUI\\Address={webui_address}\n\
         WebUI\\CSRFProtection={csrf_protection}\n\
         WebUI\\HostHeaderValidation={host_header_validation}\n\
         WebUI\\LocalHostAuth={localhost_auth}\n\
         WebUI\\ServerDomains={server_domains}\n\
         WebUI\\UseUPnP={webui_upnp}\n",
        port_range_min = env_or("QBITTORRENT__BT_PORT", DEFAULT_BT_PORT),
        upnp = env_or("QBT_UPNP", "false"),
        locale = env_or("QBT_LOCALE", "en"),
        use_random_port = env_or("QBT_USE_RANDOM_PORT", "false"),
        webui_address = env_or("QBT_WEBUI_ADDRESS", "*"),
        csrf_protection = env_or("QBT_CSRF_PROTECTION", "false"),
        host_header_validation = env_or("QBT_HOST_HEADER_VALIDATION", "false"),
        localhost_auth = env_or("QBT_LOCALHOST_AUTH", "false"),
        server_domains = env_or("QBT_SERVER_DOMAINS", "*"),
        webui_upnp = env_or("QBT_WEBUI_USE_UPNP", "false"),
    )
}
