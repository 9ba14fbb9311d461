use thiserror::Error;

use super::BuildVersion;

#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Store file error: {0}")]
    StoreFile(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid build version: {0}")]
    InvalidVersion(String),

    #[error("Cannot downgrade from build version {from} to {to}")]
    Downgrade { from: BuildVersion, to: BuildVersion },

    #[error("Upgrade action {action} failed on {failed} item(s)")]
    ItemFailures { action: &'static str, failed: usize },
}

pub type Result<T> = std::result::Result<T, UpgradeError>;

impl<T> From<std::sync::PoisonError<T>> for UpgradeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl From<std::io::Error> for UpgradeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for UpgradeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
