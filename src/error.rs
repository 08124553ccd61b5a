use docsql_core::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown time zone '{0}'")]
    InvalidTimezone(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub type AppResult<T> = Result<T, AppError>;
