use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No content, URL or image provided")]
    MissingInput,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream model error: {0}")]
    Upstream(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Short machine-readable name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingInput => "MissingInput",
            Error::InvalidRequest(_) => "InvalidRequest",
            Error::Configuration(_) => "ConfigurationError",
            Error::Upstream(_) | Error::Http(_) => "UpstreamError",
            Error::Persistence(_) => "PersistenceError",
            Error::Storage(_) => "StorageError",
            Error::Unsupported(_) => "Unsupported",
            Error::Io(_) | Error::Serialization(_) | Error::External(_) => "InternalError",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
