use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostWardenError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("the supplied timezone {0} is invalid")]
    InvalidTimezone(String),
}
