use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Error reported by the backend itself, with its human-readable message.
    #[error("{message}")]
    Backend { message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn backend(message: impl Into<String>) -> ApiError {
        ApiError::Backend {
            message: message.into(),
        }
    }
}
