use crate::config::ConfigError;
use crate::curation::CurationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Curation error: {0}")]
    Curation(#[from] CurationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, ViewMapError>;
