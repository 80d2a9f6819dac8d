use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutlineError {
    /// The PDF could not be opened or its content could not be decoded.
    #[error("Failed to extract text from PDF: {0}")]
    Extraction(String),
    #[error("No trained model found: missing {}", .0.display())]
    MissingModel(PathBuf),
    /// A model artifact was present but could not be loaded or applied.
    #[error("Model error: {0}")]
    Model(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for OutlineError {
    fn from(e: lopdf::Error) -> Self {
        OutlineError::Extraction(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OutlineError>;
