//! Environment-variable configuration (spec §6), following the teacher's
//! `oj-daemon/src/env.rs` convention of one small reader function per
//! setting rather than a derive-based config crate. No INI file loader is
//! implemented (out of scope); `SW_*` is the env var prefix this workspace
//! uses in place of the teacher's `OJ_*`.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DaemonError, Result};

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_duration_secs(name: &str, default: Duration) -> Duration {
    env_string(name).and_then(|s| s.parse::<u64>().ok()).map(Duration::from_secs).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_string(name).as_deref() {
        Some("1") | Some("true") => true,
        Some("0") | Some("false") => false,
        _ => default,
    }
}

/// Resolve the state directory: `SW_STATE_DIR` > `XDG_STATE_HOME/scanwatchd`
/// > `~/.local/state/scanwatchd`, mirroring the teacher's `state_dir()`.
fn state_dir() -> Result<PathBuf> {
    if let Some(dir) = env_string("SW_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = env_string("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("scanwatchd"));
    }
    let home = env_string("HOME").ok_or(DaemonError::Config("neither SW_STATE_DIR, XDG_STATE_HOME, nor HOME is set"))?;
    Ok(PathBuf::from(home).join(".local/state/scanwatchd"))
}

/// Which runtime watchers to start. Both may run concurrently (spec §5:
/// "one watcher task per container runtime").
#[derive(Debug, Clone, Copy, Default)]
pub struct WatcherToggles {
    pub docker: bool,
    pub kubernetes: bool,
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub timeout: Duration,
}

impl JobSettings {
    fn from_env(prefix: &str, default_interval: Duration, default_timeout: Duration) -> Self {
        Self {
            enabled: env_bool(&format!("SW_{prefix}_ENABLED"), true),
            interval: env_duration_secs(&format!("SW_{prefix}_INTERVAL_SECS"), default_interval),
            timeout: env_duration_secs(&format!("SW_{prefix}_TIMEOUT_SECS"), default_timeout),
        }
    }
}

/// The daemon's full runtime configuration, constructed either by an
/// embedder directly or via [`DaemonConfig::from_env`].
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Path to the `containers.db` relational store.
    pub db_path: PathBuf,
    /// Vulnerability database cache root, owned exclusively by the Matcher.
    pub vuln_db_cache_dir: PathBuf,
    /// Daemon log file directory (rotated via `tracing-appender`).
    pub log_dir: PathBuf,
    pub syft_binary: String,
    pub grype_binary: String,
    pub sbom_timeout: Duration,
    pub vuln_timeout: Duration,
    pub queue_max_depth: usize,
    pub watchers: WatcherToggles,
    pub rescan: JobSettings,
    pub refresh: JobSettings,
    pub cleanup: JobSettings,
    pub cleanup_retention: chrono::Duration,
}

impl DaemonConfig {
    /// Reads every `SW_*` variable directly via `std::env::var`, the way
    /// `oj-daemon/src/env.rs` reads `OJ_*` — no config file format is parsed.
    pub fn from_env() -> Result<Self> {
        let state_dir = state_dir()?;

        let queue_max_depth = env_string("SW_QUEUE_MAX_DEPTH")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);

        let cleanup_retention_hours = env_string("SW_CLEANUP_RETENTION_HOURS")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(sw_scheduler::DEFAULT_RETENTION_HOURS);

        Ok(Self {
            db_path: env_string("SW_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| state_dir.join("containers.db")),
            vuln_db_cache_dir: env_string("SW_CACHE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| state_dir.join("cache/grype")),
            log_dir: env_string("SW_LOG_DIR").map(PathBuf::from).unwrap_or_else(|| state_dir.join("logs")),
            syft_binary: env_string("SW_SYFT_BINARY").unwrap_or_else(|| "syft".to_string()),
            grype_binary: env_string("SW_GRYPE_BINARY").unwrap_or_else(|| "grype".to_string()),
            sbom_timeout: env_duration_secs("SW_SBOM_TIMEOUT_SECS", Duration::from_secs(5 * 60)),
            vuln_timeout: env_duration_secs("SW_VULN_TIMEOUT_SECS", Duration::from_secs(5 * 60)),
            queue_max_depth,
            watchers: WatcherToggles {
                docker: env_bool("SW_WATCH_DOCKER", true),
                kubernetes: env_bool("SW_WATCH_KUBERNETES", false),
            },
            rescan: JobSettings::from_env("RESCAN", Duration::from_secs(30 * 60), Duration::from_secs(30 * 60)),
            refresh: JobSettings::from_env("REFRESH", Duration::from_secs(10 * 60), Duration::from_secs(10 * 60)),
            cleanup: JobSettings::from_env("CLEANUP", Duration::from_secs(60 * 60), Duration::from_secs(60 * 60)),
            cleanup_retention: chrono::Duration::hours(cleanup_retention_hours),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
