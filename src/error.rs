use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Agent failed: {0}")]
    Agent(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Training failed: {0}")]
    TrainingFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for OfferError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for OfferError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OfferError>;
