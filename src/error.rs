use thiserror::Error;

// Fatal configuration failures, reported before the listener binds.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyParseError {
    #[error("cooldown spec has no default duration")]
    MissingDefault,
    #[error("invalid default cooldown duration: {0:?}")]
    InvalidDefault(String),
    #[error("invalid cooldown tier: {0:?} (expected duration:threshold)")]
    InvalidTier(String),
    #[error("duplicate bandwidth threshold: {0} GiB")]
    DuplicateThreshold(f64),
}

// Transient metering failures, absorbed by the bandwidth monitor.
#[derive(Debug, Error)]
pub enum MeteringError {
    #[error("metering request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("metering endpoint answered HTTP {0}")]
    Status(u16),
    #[error("metering endpoint returned an unexpected payload")]
    Malformed,
}
