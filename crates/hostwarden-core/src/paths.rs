use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "HOSTWARDEN_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostwarden/config.toml";

/// Name of the daemon's own log file inside the log directory.
pub const LOG_FILE_NAME: &str = "hostwarden.log";
/// Name of the policy file inside the logrotate configuration directory.
pub const LOGROTATE_POLICY_NAME: &str = "hostwarden";

const TIMEZONE_FILE: &str = "/etc/timezone";
const LOGROTATE_DIR: &str = "/etc/logrotate.d";
const ZONEINFO_ENV: &str = "ZONEINFO";
const ZONEINFO_DIRS: [&str; 3] = [
    "/usr/share/zoneinfo/",
    "/usr/share/lib/zoneinfo/",
    "/usr/lib/locale/TZ/",
];

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_path: PathBuf,
}

impl ConfigPaths {
    pub fn resolve() -> Self {
        let config_path = std::env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self { config_path }
    }
}

/// Host locations consulted during bootstrap. Tests point these at a scratch
/// directory instead of the live system.
#[derive(Debug, Clone)]
pub struct HostPaths {
    pub timezone_file: PathBuf,
    pub logrotate_dir: PathBuf,
    pub zoneinfo_dirs: Vec<PathBuf>,
}

impl HostPaths {
    pub fn system() -> Self {
        let mut zoneinfo_dirs = Vec::with_capacity(ZONEINFO_DIRS.len() + 1);
        if let Some(custom) = std::env::var_os(ZONEINFO_ENV).filter(|value| !value.is_empty()) {
            zoneinfo_dirs.push(PathBuf::from(custom));
        }
        zoneinfo_dirs.extend(ZONEINFO_DIRS.iter().map(PathBuf::from));
        Self {
            timezone_file: PathBuf::from(TIMEZONE_FILE),
            logrotate_dir: PathBuf::from(LOGROTATE_DIR),
            zoneinfo_dirs,
        }
    }

    pub fn logrotate_policy(&self) -> PathBuf {
        self.logrotate_dir.join(LOGROTATE_POLICY_NAME)
    }
}

/// Location of the JSON file that tracks server states.
pub fn states_path(root_directory: &Path) -> PathBuf {
    root_directory.join("states.json")
}

/// Directory that holds server installation logs.
pub fn install_log_path(log_directory: &Path) -> PathBuf {
    log_directory.join("install")
}

pub fn log_file_path(log_directory: &Path) -> PathBuf {
    log_directory.join(LOG_FILE_NAME)
}
