use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Rewrap transport failures as a source-level extraction failure.
    pub fn into_extraction(self) -> Self {
        match self {
            Error::Extraction(_) => self,
            Error::Http(e) if e.is_timeout() => Error::Extraction(format!("request timed out: {}", e)),
            other => Error::Extraction(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
