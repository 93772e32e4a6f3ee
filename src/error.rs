use crate::interfaces::router::RouteError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DonationError>;

#[derive(Error, Debug)]
pub enum DonationError {
    #[error("Card tokenization failed: {0}")]
    Tokenization(String),
    #[error("Platform customer creation failed: {0}")]
    CustomerCreation(String),
    #[error("Platform card creation failed: {0}")]
    CardCreation(String),
    #[error("Subscription creation failed: {0}")]
    Subscription(String),
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("No authenticated user in session")]
    NotAuthenticated,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Route error: {0}")]
    RouteError(#[from] RouteError),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
}

impl From<serde_json::Error> for DonationError {
    fn from(e: serde_json::Error) -> Self {
        Self::InternalError(Box::new(e))
    }
}
