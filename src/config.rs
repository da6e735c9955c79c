//! Configuration and hosts file path resolution.
//!
//! Precedence: `--file` flag, then ETCHOSTS_FILE env var, then the platform
//! hosts file.

use std::path::{Path, PathBuf};

/// Env var overriding the hosts file path.
pub const FILE_ENV: &str = "ETCHOSTS_FILE";

/// Env var holding a tracing filter directive (e.g. `etchosts=debug`).
pub const LOG_ENV: &str = "ETCHOSTS_LOG";

/// Platform hosts file used when neither flag nor env var is set.
#[cfg(not(windows))]
pub const DEFAULT_HOSTS_FILE: &str = "/etc/hosts";

#[cfg(windows)]
pub const DEFAULT_HOSTS_FILE: &str = r"C:\Windows\System32\drivers\etc\hosts";

/// Settings handed to every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub hosts_file: PathBuf,
}

impl Config {
    /// Config pointing at `hosts_file`.
    pub fn new(hosts_file: impl Into<PathBuf>) -> Self {
        Self {
            hosts_file: hosts_file.into(),
        }
    }

    /// Resolve from an optional flag value, the environment, or the default.
    pub fn resolve(flag: Option<PathBuf>) -> Self {
        Self::resolve_with(flag, std::env::var_os(FILE_ENV).map(PathBuf::from))
    }

    fn resolve_with(flag: Option<PathBuf>, env: Option<PathBuf>) -> Self {
        let hosts_file = flag
            .or(env.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOSTS_FILE));
        Self { hosts_file }
    }

    /// Resolved hosts file path.
    pub fn hosts_file(&self) -> &Path {
        &self.hosts_file
    }
}
