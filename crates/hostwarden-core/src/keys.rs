//! Dotted keys into the configuration store.

pub const SYSTEM: &str = "system";

pub const ROOT_DIRECTORY: &str = "system.root_directory";
pub const LOG_DIRECTORY: &str = "system.log_directory";
pub const DATA: &str = "system.data";
pub const ARCHIVE_DIRECTORY: &str = "system.archive_directory";
pub const BACKUP_DIRECTORY: &str = "system.backup_directory";
pub const USERNAME: &str = "system.username";
pub const TIMEZONE: &str = "system.timezone";
pub const USER_UID: &str = "system.user.uid";
pub const USER_GID: &str = "system.user.gid";
pub const DISK_CHECK_INTERVAL: &str = "system.disk_check_interval";
pub const CHECK_PERMISSIONS_ON_BOOT: &str = "system.check_permissions_on_boot";
pub const ENABLE_LOG_ROTATE: &str = "system.enable_log_rotate";
pub const WEBSOCKET_LOG_COUNT: &str = "system.websocket_log_count";
pub const DETECT_CLEAN_EXIT_AS_CRASH: &str = "system.crash_detection.detect_clean_exit_as_crash";
pub const CRASH_DETECTION_TIMEOUT: &str = "system.crash_detection.timeout";
pub const BACKUP_WRITE_LIMIT: &str = "system.backups.write_limit";
pub const TRANSFER_DOWNLOAD_LIMIT: &str = "system.transfers.download_limit";
