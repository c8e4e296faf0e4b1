use ort::Error as OrtError;

/// Represents the different types of errors that can occur while classifying an image.
///
/// Every variant is terminal for the request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The input bytes could not be decoded into an image
    #[error("Decode failure: {0}")]
    DecodeFailure(String),
    /// The inference engine failed or returned malformed output
    #[error("Inference failure: {0}")]
    InferenceFailure(String),
    /// The inference engine returned a zero-length score vector
    #[error("Inference returned no scores")]
    EmptyScores,
    /// Error occurred while loading or inspecting the ONNX model
    #[error("Model error: {0}")]
    ModelError(String),
    /// Error occurred during the build phase
    #[error("Build error: {0}")]
    BuildError(String),
    /// Error occurred due to invalid input parameters
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::BuildError(err.to_string())
    }
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::DecodeFailure(err.to_string())
    }
}
