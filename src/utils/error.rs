//! Error Handling Module
//!
//! Error type shared by the dataset, model, training and inference layers.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the classification pipeline
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model construction, saving or loading
    #[error("Model error: {0}")]
    Model(String),

    /// Error with training
    #[error("Training error: {0}")]
    Training(String),

    /// Error with inference
    #[error("Inference error: {0}")]
    Inference(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::Serialization(err.to_string())
    }
}

impl From<zip::result::ZipError> for ClassifierError {
    fn from(err: zip::result::ZipError) -> Self {
        ClassifierError::Dataset(format!("zip archive: {}", err))
    }
}

/// Convenience Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| ClassifierError::InvalidInput(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| ClassifierError::InvalidInput(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| ClassifierError::InvalidInput(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| ClassifierError::InvalidInput(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClassifierError::Dataset("validation set is empty".to_string());
        assert_eq!(format!("{}", err), "Dataset error: validation set is empty");
    }

    #[test]
    fn test_image_load_error_mentions_path() {
        let path = PathBuf::from("/data/crops/rice/0001.jpg");
        let err = ClassifierError::ImageLoad(path, "unsupported format".to_string());
        assert!(format!("{}", err).contains("0001.jpg"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<u32, _> = serde_json::from_str::<u32>("not json");
        let err: ClassifierError = parse.unwrap_err().into();
        assert!(matches!(err, ClassifierError::Serialization(_)));
    }

    #[test]
    fn test_option_context() {
        let opt: Option<i32> = None;
        let with_context = opt.context("class list is empty");
        assert!(matches!(with_context, Err(ClassifierError::InvalidInput(_))));
    }
}
