use ort::Error as OrtError;
use std::fmt;

/// Represents the different types of errors that can occur in the image classifier.
#[derive(Debug)]
pub enum ClassifierError {
    /// The model file is missing, unreadable, or does not match the expected architecture
    ModelLoad(String),
    /// The uploaded bytes could not be decoded as an image
    ImageDecode(String),
    /// The preprocessed tensor does not have the shape the model expects
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    /// The forward pass failed or produced an unusable output
    Inference(String),
    /// Error occurred due to invalid builder parameters
    Validation(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoad(msg) => write!(f, "Model load error: {}", msg),
            Self::ImageDecode(msg) => write!(f, "Image decode error: {}", msg),
            Self::ShapeMismatch { expected, actual } => write!(
                f,
                "Shape mismatch: expected tensor of shape {:?}, got {:?}",
                expected, actual
            ),
            Self::Inference(msg) => write!(f, "Inference error: {}", msg),
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelLoad(err.to_string())
    }
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::ImageDecode(err.to_string())
    }
}
