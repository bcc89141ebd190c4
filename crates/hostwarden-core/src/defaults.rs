//! Built-in values the configuration store starts from before a file is overlaid.

use toml::{Table, Value};

use crate::keys;

pub const ROOT_DIRECTORY: &str = "/var/lib/hostwarden";
pub const LOG_DIRECTORY: &str = "/var/log/hostwarden";
pub const DATA: &str = "/var/lib/hostwarden/volumes";
pub const ARCHIVE_DIRECTORY: &str = "/var/lib/hostwarden/archives";
pub const BACKUP_DIRECTORY: &str = "/var/lib/hostwarden/backups";
pub const USERNAME: &str = "hostwarden";

/// Seconds before a cached disk usage figure is considered stale.
pub const DISK_CHECK_INTERVAL: i64 = 150;
pub const WEBSOCKET_LOG_COUNT: i64 = 150;
/// Seconds between crashes that still count as a boot loop.
pub const CRASH_DETECTION_TIMEOUT: i64 = 60;

pub fn default_table() -> Table {
    let entries: [(&str, Value); 17] = [
        (keys::ROOT_DIRECTORY, Value::String(ROOT_DIRECTORY.to_string())),
        (keys::LOG_DIRECTORY, Value::String(LOG_DIRECTORY.to_string())),
        (keys::DATA, Value::String(DATA.to_string())),
        (keys::ARCHIVE_DIRECTORY, Value::String(ARCHIVE_DIRECTORY.to_string())),
        (keys::BACKUP_DIRECTORY, Value::String(BACKUP_DIRECTORY.to_string())),
        (keys::USERNAME, Value::String(USERNAME.to_string())),
        (keys::TIMEZONE, Value::String(String::new())),
        (keys::USER_UID, Value::Integer(0)),
        (keys::USER_GID, Value::Integer(0)),
        (keys::DISK_CHECK_INTERVAL, Value::Integer(DISK_CHECK_INTERVAL)),
        (keys::CHECK_PERMISSIONS_ON_BOOT, Value::Boolean(true)),
        (keys::ENABLE_LOG_ROTATE, Value::Boolean(true)),
        (keys::WEBSOCKET_LOG_COUNT, Value::Integer(WEBSOCKET_LOG_COUNT)),
        (keys::DETECT_CLEAN_EXIT_AS_CRASH, Value::Boolean(true)),
        (keys::CRASH_DETECTION_TIMEOUT, Value::Integer(CRASH_DETECTION_TIMEOUT)),
        (keys::BACKUP_WRITE_LIMIT, Value::Integer(0)),
        (keys::TRANSFER_DOWNLOAD_LIMIT, Value::Integer(0)),
    ];

    let mut table = Table::new();
    for (key, value) in entries {
        crate::config::insert_dotted(&mut table, key, value);
    }
    table
}
