use std::path::Path;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{info, warn};

use bootstrap::{Bootstrap, LogRotation};
use hostwarden_core::{keys, ConfigPaths, ConfigStore, HostPaths};
use runner::SystemRunner;

mod logging;

use logging::LogFile;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // SIGHUP must not terminate the process while bootstrap is still running.
    let signals = ShutdownSignals::install()?;
    let paths = ConfigPaths::resolve();
    let (mut store, found) = load_config(&paths.config_path)?;

    let log_file = logging::init(&store.get_path(keys::LOG_DIRECTORY))?;
    if !found {
        warn!(path = %paths.config_path.display(), "no config file found, using defaults");
    }

    let runner = SystemRunner::new();
    let report = Bootstrap::new(HostPaths::system(), &runner)
        .run(&mut store)
        .await
        .context("bootstrap host")?;
    if let Some(LogRotation::Installed(path)) = &report.log_rotation {
        info!(path = %path.display(), "installed log rotation policy");
    }

    let system = store.system()?;
    info!(
        root = %system.root_directory.display(),
        states = %system.states_path().display(),
        user = %system.username,
        "hostwarden daemon ready"
    );

    wait_for_shutdown(signals, &log_file).await
}

fn load_config(path: &Path) -> Result<(ConfigStore, bool)> {
    if !path.exists() {
        return Ok((ConfigStore::default(), false));
    }
    Ok((ConfigStore::load(path)?, true))
}

struct ShutdownSignals {
    hangup: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            hangup: signal(SignalKind::hangup()).context("install SIGHUP handler")?,
            terminate: signal(SignalKind::terminate()).context("install SIGTERM handler")?,
        })
    }
}

/// Parks until SIGTERM or ctrl-c. SIGHUP comes from the logrotate hook and
/// reopens the log file.
async fn wait_for_shutdown(signals: ShutdownSignals, log_file: &LogFile) -> Result<()> {
    let ShutdownSignals {
        mut hangup,
        mut terminate,
    } = signals;

    loop {
        tokio::select! {
            _ = hangup.recv() => match log_file.reopen() {
                Ok(()) => info!("reopened log file"),
                Err(err) => warn!(error = %format!("{err:#}"), "failed to reopen log file"),
            },
            _ = terminate.recv() => break,
            result = tokio::signal::ctrl_c() => {
                result.context("listen for ctrl-c")?;
                break;
            }
        }
    }

    info!("shutting down");
    Ok(())
}
