use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use hostwarden_core::paths::LOG_FILE_NAME;
use hostwarden_core::{keys, ConfigStore, HostPaths};

/// Process name signalled by the post-rotation hook.
pub const DAEMON_PROCESS_NAME: &str = "hostwarden";

const POLICY_FILE_MODE: u32 = 0o644;

/// What [`install_log_rotation`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRotation {
    Disabled,
    /// The host has no logrotate configuration directory.
    Unsupported,
    AlreadyPresent,
    Installed(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogrotatePolicy {
    pub directory: PathBuf,
    pub user_id: i64,
    pub group_id: i64,
}

impl LogrotatePolicy {
    pub fn from_store(store: &ConfigStore) -> Self {
        Self {
            directory: store.get_path(keys::LOG_DIRECTORY),
            user_id: store.get_int(keys::USER_UID),
            group_id: store.get_int(keys::USER_GID),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{log} {{
    size 10M
    compress
    delaycompress
    dateext
    maxage 7
    missingok
    notifempty
    create 0640 {uid} {gid}
    postrotate
        killall -SIGHUP {process}
    endscript
}}
",
            log = self.directory.join(LOG_FILE_NAME).display(),
            uid = self.user_id,
            gid = self.group_id,
            process = DAEMON_PROCESS_NAME,
        )
    }
}

/// Writes a logrotate policy for the daemon's log when rotation is enabled,
/// the host has a logrotate directory and no policy exists yet. An existing
/// policy is never touched.
pub fn install_log_rotation(store: &ConfigStore, host: &HostPaths) -> Result<LogRotation> {
    if !store.get_bool(keys::ENABLE_LOG_ROTATE) {
        info!("skipping log rotate configuration, disabled in config file");
        return Ok(LogRotation::Disabled);
    }

    match fs::metadata(&host.logrotate_dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(LogRotation::Unsupported),
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LogRotation::Unsupported),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("inspect {}", host.logrotate_dir.display()))
        }
    }

    let target = host.logrotate_policy();
    match fs::metadata(&target) {
        Ok(_) => return Ok(LogRotation::AlreadyPresent),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err).with_context(|| format!("inspect {}", target.display())),
    }

    info!(path = %target.display(), "no log rotation configuration found: adding file now");
    let policy = LogrotatePolicy::from_store(store);
    if !write_policy(&target, &policy)? {
        return Ok(LogRotation::AlreadyPresent);
    }
    Ok(LogRotation::Installed(target))
}

/// Returns `false` when the file appeared before it could be created.
fn write_policy(target: &Path, policy: &LogrotatePolicy) -> Result<bool> {
    let file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(POLICY_FILE_MODE)
        .open(target)
    {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(err).with_context(|| format!("create {}", target.display())),
    };

    let mut writer = BufWriter::new(file);
    writer
        .write_all(policy.render().as_bytes())
        .and_then(|()| writer.flush())
        .context("failed to write logrotate to disk")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn host_in(temp: &TempDir) -> HostPaths {
        HostPaths {
            timezone_file: temp.path().join("etc/timezone"),
            logrotate_dir: temp.path().join("etc/logrotate.d"),
            zoneinfo_dirs: Vec::new(),
        }
    }

    fn store() -> ConfigStore {
        let mut store = ConfigStore::default();
        store.set_string(keys::LOG_DIRECTORY, "/var/log/hostwarden");
        store.set(keys::USER_UID, 988_i64);
        store.set(keys::USER_GID, 987_i64);
        store
    }

    #[test]
    fn render_produces_policy_document() {
        let policy = LogrotatePolicy {
            directory: PathBuf::from("/var/log/hostwarden"),
            user_id: 988,
            group_id: 987,
        };
        let expected = "/var/log/hostwarden/hostwarden.log {
    size 10M
    compress
    delaycompress
    dateext
    maxage 7
    missingok
    notifempty
    create 0640 988 987
    postrotate
        killall -SIGHUP hostwarden
    endscript
}
";
        assert_eq!(policy.render(), expected);
    }

    #[test]
    fn disabled_rotation_is_noop() {
        let temp = TempDir::new().unwrap();
        let host = host_in(&temp);
        fs::create_dir_all(&host.logrotate_dir).unwrap();
        let mut store = store();
        store.set(keys::ENABLE_LOG_ROTATE, false);

        assert_eq!(install_log_rotation(&store, &host).unwrap(), LogRotation::Disabled);
        assert!(!host.logrotate_policy().exists());
    }

    #[test]
    fn missing_logrotate_dir_is_noop() {
        let temp = TempDir::new().unwrap();
        let host = host_in(&temp);

        assert_eq!(install_log_rotation(&store(), &host).unwrap(), LogRotation::Unsupported);
        assert!(!host.logrotate_dir.exists());
    }

    #[test]
    fn logrotate_path_that_is_a_file_is_noop() {
        let temp = TempDir::new().unwrap();
        let host = host_in(&temp);
        fs::create_dir_all(host.logrotate_dir.parent().unwrap()).unwrap();
        fs::write(&host.logrotate_dir, b"").unwrap();

        assert_eq!(install_log_rotation(&store(), &host).unwrap(), LogRotation::Unsupported);
    }

    #[test]
    fn existing_policy_is_preserved() {
        let temp = TempDir::new().unwrap();
        let host = host_in(&temp);
        fs::create_dir_all(&host.logrotate_dir).unwrap();
        fs::write(host.logrotate_policy(), "# customised\n").unwrap();

        assert_eq!(install_log_rotation(&store(), &host).unwrap(), LogRotation::AlreadyPresent);
        assert_eq!(fs::read_to_string(host.logrotate_policy()).unwrap(), "# customised\n");
    }

    #[test]
    fn installs_once_then_noop() {
        let temp = TempDir::new().unwrap();
        let host = host_in(&temp);
        fs::create_dir_all(&host.logrotate_dir).unwrap();
        let store = store();

        let first = install_log_rotation(&store, &host).unwrap();
        assert_eq!(first, LogRotation::Installed(host.logrotate_policy()));
        let written = fs::read_to_string(host.logrotate_policy()).unwrap();
        assert_eq!(written, LogrotatePolicy::from_store(&store).render());
        assert!(written.contains("create 0640 988 987"));

        let second = install_log_rotation(&store, &host).unwrap();
        assert_eq!(second, LogRotation::AlreadyPresent);
        assert_eq!(fs::read_to_string(host.logrotate_policy()).unwrap(), written);
    }

    #[test]
    fn dangling_policy_symlink_is_not_followed() {
        let temp = TempDir::new().unwrap();
        let host = host_in(&temp);
        fs::create_dir_all(&host.logrotate_dir).unwrap();
        let elsewhere = temp.path().join("elsewhere");
        std::os::unix::fs::symlink(&elsewhere, host.logrotate_policy()).unwrap();

        assert_eq!(install_log_rotation(&store(), &host).unwrap(), LogRotation::AlreadyPresent);
        assert!(!elsewhere.exists());
    }
}
