use image::ImageError;
use ort::Error as OrtError;
use std::fmt;

/// Represents the different types of errors that can occur in the image classifier.
///
/// The kinds are kept apart so callers can pick a policy per kind: a load
/// failure aborts startup, a decode failure rejects a single image, and an
/// inference failure flags a model/label configuration fault.
#[derive(Debug)]
pub enum ClassifierError {
    /// The model artifact or label dictionary is missing, unreadable or malformed
    ModelLoadError(String),
    /// The supplied image could not be read or decoded
    ImageDecodeError(String),
    /// The forward pass failed or its output does not line up with the labels
    InferenceError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoadError(msg) => write!(f, "Model load error: {}", msg),
            Self::ImageDecodeError(msg) => write!(f, "Image decode error: {}", msg),
            Self::InferenceError(msg) => write!(f, "Inference error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelLoadError(err.to_string())
    }
}

impl From<ImageError> for ClassifierError {
    fn from(err: ImageError) -> Self {
        ClassifierError::ImageDecodeError(err.to_string())
    }
}
