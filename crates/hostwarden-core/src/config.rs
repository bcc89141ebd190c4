use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::defaults;
use crate::error::HostWardenError;
use crate::keys;
use crate::paths;

const MIB: u64 = 1024 * 1024;

/// Process-wide configuration passed explicitly to whatever needs to read or
/// rewrite it. Lookups use dotted keys such as `system.user.uid` and yield the
/// zero value of the requested type when the key is missing or holds another type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStore {
    table: Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub root_directory: PathBuf,
    pub log_directory: PathBuf,
    pub data: PathBuf,
    pub archive_directory: PathBuf,
    pub backup_directory: PathBuf,
    pub username: String,
    pub timezone: String,
    pub user: UserIds,
    /// Seconds; zero disables disk usage checks entirely.
    pub disk_check_interval: u64,
    pub check_permissions_on_boot: bool,
    pub enable_log_rotate: bool,
    pub websocket_log_count: u32,
    pub crash_detection: CrashDetectionConfig,
    pub backups: BackupsConfig,
    pub transfers: TransfersConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIds {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashDetectionConfig {
    pub detect_clean_exit_as_crash: bool,
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupsConfig {
    /// MiB/s, anything below one is unlimited.
    pub write_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransfersConfig {
    /// MiB/s, anything below one is unlimited.
    pub download_limit: i64,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            table: defaults::default_table(),
        }
    }
}

impl ConfigStore {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let overlay: Table = toml::from_str(contents).context("parse config TOML")?;
        let mut store = Self::default();
        merge_tables(&mut store.table, overlay);
        Ok(store)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read config at {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("load config at {}", path.display()))
    }

    pub fn get_string(&self, key: &str) -> String {
        self.lookup(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn get_path(&self, key: &str) -> PathBuf {
        PathBuf::from(self.get_string(key))
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.lookup(key).and_then(Value::as_integer).unwrap_or(0)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.lookup(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        insert_dotted(&mut self.table, key, value.into());
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        let value: String = value.into();
        self.set(key, value);
    }

    /// Typed snapshot of the `system` table.
    pub fn system(&self) -> Result<SystemConfig> {
        let table = match self.table.get(keys::SYSTEM) {
            Some(Value::Table(table)) => table.clone(),
            _ => Table::new(),
        };
        let config = Value::Table(table)
            .try_into()
            .map_err(|err: toml::de::Error| HostWardenError::InvalidConfig(err.to_string()))?;
        Ok(config)
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let mut current = self.table.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }
}

impl SystemConfig {
    pub fn states_path(&self) -> PathBuf {
        paths::states_path(&self.root_directory)
    }

    pub fn install_log_path(&self) -> PathBuf {
        paths::install_log_path(&self.log_directory)
    }

    pub fn disk_check_enabled(&self) -> bool {
        self.disk_check_interval > 0
    }
}

impl BackupsConfig {
    /// Bytes per second, `None` when unlimited.
    pub fn write_limit_bytes(&self) -> Option<u64> {
        limit_bytes(self.write_limit)
    }
}

impl TransfersConfig {
    /// Bytes per second, `None` when unlimited.
    pub fn download_limit_bytes(&self) -> Option<u64> {
        limit_bytes(self.download_limit)
    }
}

fn limit_bytes(mib_per_second: i64) -> Option<u64> {
    if mib_per_second < 1 {
        return None;
    }
    u64::try_from(mib_per_second).ok().map(|mib| mib.saturating_mul(MIB))
}

pub(crate) fn insert_dotted(table: &mut Table, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            table.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = table
                .entry(head.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            if let Value::Table(child) = entry {
                insert_dotted(child, rest, value);
            }
        }
    }
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match value {
            Value::Table(incoming) => {
                if let Some(Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                    continue;
                }
                base.insert(key, Value::Table(incoming));
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}
