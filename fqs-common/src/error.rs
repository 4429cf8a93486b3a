//! Error type for the storage and configuration layers

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable file, bad value, or unsupported backend
    #[error("Configuration error: {0}")]
    Config(String),

    /// No scan with this id is stored
    #[error("Scan {0} not found")]
    ScanNotFound(Uuid),

    /// A stored value could not be decoded or a value could not be encoded
    /// for storage
    #[error("Corrupt scan data: {0}")]
    Corrupt(String),
}
