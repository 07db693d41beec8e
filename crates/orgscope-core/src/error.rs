use thiserror::Error;

use crate::network::ClientError;
use crate::providers::ProviderError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("HTTP client error: {0}")]
    Client(#[from] ClientError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
