pub mod config;
pub mod defaults;
pub mod error;
pub mod keys;
pub mod paths;

pub use config::{BackupsConfig, ConfigStore, CrashDetectionConfig, SystemConfig, TransfersConfig, UserIds};
pub use error::HostWardenError;
pub use paths::{install_log_path, log_file_path, states_path, ConfigPaths, HostPaths};
