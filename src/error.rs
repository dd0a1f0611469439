use std::time::Duration;
use thiserror::Error;

/// Engine and preprocessing failures.
///
/// A `ProcessingError` raised inside a single OCR pass is recorded on that
/// pass and never reaches the client.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),
}

/// Request-level failures of a detection.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("No image or manual input provided")]
    NoInput,

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Detection timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DetectError {
    /// The message shown to the client in the `error` field.
    pub fn user_message(&self) -> String {
        match self {
            DetectError::Decode(_) => "Failed to process image".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<OcrError> for DetectError {
    fn from(err: OcrError) -> Self {
        DetectError::Internal(err.to_string())
    }
}
