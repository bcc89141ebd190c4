//! Timezone detection for the daemon.
//!
//! An explicitly configured zone always wins and is only validated. Otherwise
//! the zone comes from the host timezone file, then from `timedatectl`, and
//! finally falls back to UTC so the daemon can still boot. Whatever value the
//! resolver ends with is written back to the store, including on error.

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use hostwarden_core::{keys, ConfigStore, HostPaths, HostWardenError};
use runner::{CommandRunner, RunnerCommand};

pub const FALLBACK_TIMEZONE: &str = "UTC";
pub const TIMEDATECTL: &str = "timedatectl";
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

const TIMEDATECTL_PATTERN: &str = r"Time zone: ([\w/]+)";
const TZIF_MAGIC: &[u8; 4] = b"TZif";

pub async fn resolve_timezone(
    store: &mut ConfigStore,
    host: &HostPaths,
    runner: &dyn CommandRunner,
) -> Result<()> {
    let mut timezone = store.get_string(keys::TIMEZONE);
    let result = settle_timezone(&mut timezone, host, runner).await;
    store.set_string(keys::TIMEZONE, timezone.as_str());
    result
}

async fn settle_timezone(
    timezone: &mut String,
    host: &HostPaths,
    runner: &dyn CommandRunner,
) -> Result<()> {
    if timezone.is_empty() {
        match detect_timezone(host, runner).await? {
            Some(detected) => *timezone = detected,
            None => {
                *timezone = FALLBACK_TIMEZONE.to_string();
                return Ok(());
            }
        }
    }

    let sanitized = sanitize_timezone(timezone);
    *timezone = if sanitized.is_empty() {
        FALLBACK_TIMEZONE.to_string()
    } else {
        sanitized
    };

    if !ZoneDatabase::from_host(host).contains(timezone) {
        return Err(HostWardenError::InvalidTimezone(timezone.clone()).into());
    }
    debug!(timezone = %timezone, "using timezone");
    Ok(())
}

/// `None` means detection gave up and the caller should settle on UTC.
async fn detect_timezone(host: &HostPaths, runner: &dyn CommandRunner) -> Result<Option<String>> {
    match fs::read(&host.timezone_file) {
        Ok(contents) => return Ok(Some(String::from_utf8_lossy(&contents).trim().to_string())),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed to open timezone file {}", host.timezone_file.display())
            })
        }
    }

    let command = RunnerCommand::new(TIMEDATECTL, QUERY_TIMEOUT);
    let output = match runner.output(&command).await {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, "failed to execute \"timedatectl\" to determine system timezone, falling back to UTC");
            return Ok(None);
        }
    };

    let parsed = timezone_from_timedatectl(&String::from_utf8_lossy(&output))?;
    if parsed.is_none() {
        warn!("failed to parse timezone from \"timedatectl\" output, falling back to UTC");
    }
    Ok(parsed)
}

/// Pulls the zone name out of `timedatectl` status output.
pub fn timezone_from_timedatectl(output: &str) -> Result<Option<String>> {
    let pattern = Regex::new(TIMEDATECTL_PATTERN).context("compile timedatectl pattern")?;
    let name = pattern
        .captures(output)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
        .filter(|name| !name.is_empty());
    Ok(name)
}

/// Drops every character outside `[A-Za-z_/]`.
pub fn sanitize_timezone(candidate: &str) -> String {
    candidate
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '_' || *c == '/')
        .collect()
}

/// The host's compiled zoneinfo tree.
#[derive(Debug, Clone)]
pub struct ZoneDatabase {
    roots: Vec<PathBuf>,
}

impl ZoneDatabase {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn from_host(host: &HostPaths) -> Self {
        Self::new(host.zoneinfo_dirs.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        if name == FALLBACK_TIMEZONE {
            return true;
        }
        if !is_relative_zone_name(name) {
            return false;
        }
        self.roots.iter().any(|root| is_tzif(&root.join(name)))
    }
}

fn is_relative_zone_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn is_tzif(path: &Path) -> bool {
    let mut magic = [0_u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut magic))
        .map(|_| &magic == TZIF_MAGIC)
        .unwrap_or(false)
}
