//! Host preparation that runs once before the daemon starts managing servers.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use hostwarden_core::{keys, ConfigStore, HostPaths};
use runner::CommandRunner;

pub mod directories;
pub mod logrotate;
pub mod timezone;

pub use directories::provision_directories;
pub use logrotate::{install_log_rotation, LogRotation, LogrotatePolicy};
pub use timezone::{resolve_timezone, sanitize_timezone, ZoneDatabase, FALLBACK_TIMEZONE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub data_directory: PathBuf,
    pub timezone: String,
    /// `None` when installing the policy failed; the failure is logged only.
    pub log_rotation: Option<LogRotation>,
}

pub struct Bootstrap<'a> {
    host: HostPaths,
    runner: &'a dyn CommandRunner,
}

impl<'a> Bootstrap<'a> {
    pub fn new(host: HostPaths, runner: &'a dyn CommandRunner) -> Self {
        Self { host, runner }
    }

    /// Runs every step in order. Directory and timezone failures abort;
    /// a log rotation failure is logged and startup continues.
    pub async fn run(&self, store: &mut ConfigStore) -> Result<BootstrapReport> {
        provision_directories(store)?;
        resolve_timezone(store, &self.host, self.runner).await?;

        let log_rotation = match install_log_rotation(store, &self.host) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to configure log rotation on the system");
                None
            }
        };

        let report = BootstrapReport {
            data_directory: store.get_path(keys::DATA),
            timezone: store.get_string(keys::TIMEZONE),
            log_rotation,
        };
        info!(
            data = %report.data_directory.display(),
            timezone = %report.timezone,
            "host bootstrap complete"
        );
        Ok(report)
    }
}
