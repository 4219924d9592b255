//! Error types for model loading and classification.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the classifier.
#[derive(Error, Debug)]
pub enum Error {
    /// The model artifact is missing, unreadable or has an unsupported input shape
    #[error("Failed to load model {path:?}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// The label catalog is missing or is not a JSON array of strings
    #[error("Failed to load labels {path:?}: {reason}")]
    LabelLoad { path: PathBuf, reason: String },

    /// The uploaded bytes are not a decodable image
    #[error("Cannot decode image: {0}")]
    ImageDecode(String),

    /// The model predicted a class the label catalog does not know about
    #[error("Predicted class index {index} is outside the label catalog ({labels} labels)")]
    IndexMismatch { index: usize, labels: usize },

    /// The request carried no image
    #[error("No file uploaded")]
    MissingInput,

    /// Preprocessing or forward pass failure
    #[error("Inference error: {0}")]
    Inference(String),

    /// The inference did not finish within the configured deadline
    #[error("Inference timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether the error is a startup load failure, fatal before serving.
    pub fn is_startup(&self) -> bool {
        matches!(self, Error::ModelLoad { .. } | Error::LabelLoad { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
