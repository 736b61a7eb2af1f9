use thiserror::Error;

#[derive(Debug, Error)]
pub enum HearthError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidUpload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HearthError {
    /// Short error code string, logged next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            HearthError::Config(_) => "CONFIG_ERROR",
            HearthError::InvalidUpload(_) => "INVALID_UPLOAD",
            HearthError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, HearthError>;
