use std::collections::HashMap;
use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;

use super::error::ClassifierError;
use super::preprocess::{ensure_shape, ImageTensor};

/// Number of disease categories the bundled classifier distinguishes.
pub const NUM_CLASSES: usize = 39;

/// Anything that turns a preprocessed image tensor into one score per class.
///
/// Implementations must be pure: no state may change between calls, so a
/// single instance can be shared by concurrent requests.
pub trait ScoreModel: Send + Sync {
    /// Width of the score vector and row count of every reference table.
    fn num_classes(&self) -> usize;

    /// Runs one forward pass over a `[1, 3, 224, 224]` tensor.
    fn forward(&self, tensor: ImageTensor) -> Result<Vec<f32>, ClassifierError>;
}

/// A thread-safe image classifier backed by an ONNX Runtime session.
///
/// Constructed once through [`ClassifierBuilder`](super::builder::ClassifierBuilder)
/// and never mutated afterwards. `Session::run` only needs `&self`, so the model
/// can be shared behind an `Arc` without a lock.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use plantdoc::{ClassifierModel, ScoreModel, preprocess};
///
/// let model = ClassifierModel::load("plant_disease_model.onnx")?;
/// let tensor = preprocess(&std::fs::read("leaf.jpg")?)?;
/// let scores = model.forward(tensor)?;
/// assert_eq!(scores.len(), model.num_classes());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ClassifierModel {
    pub model_path: String,
    pub(crate) session: Session,
    pub(crate) input_name: String,
    pub(crate) num_classes: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ClassifierModel>();
    }
};

impl ClassifierModel {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Loads a 39-class model with the default runtime configuration.
    ///
    /// # Errors
    /// - `ModelLoad` if the file is missing, unreadable, or its output width is not 39
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        Self::builder().with_model_file(path)?.build()
    }

    /// Returns information about the loaded model
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            model_path: self.model_path.clone(),
            input_name: self.input_name.clone(),
            num_classes: self.num_classes,
        }
    }

    pub(crate) fn run_session(&self, tensor: ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(tensor)
                .map_err(|e| ClassifierError::Inference(format!("Failed to create input tensor: {}", e)))?,
        );

        let outputs = self.session.run(input_tensors)
            .map_err(|e| ClassifierError::Inference(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        Ok(output_tensor.iter().copied().collect())
    }
}

impl ScoreModel for ClassifierModel {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, tensor: ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        ensure_shape(&tensor)?;
        let scores = self.run_session(tensor)?;
        if scores.len() != self.num_classes {
            return Err(ClassifierError::Inference(format!(
                "Model produced {} scores, expected {}",
                scores.len(),
                self.num_classes
            )));
        }
        Ok(scores)
    }
}
