use std::path::Path;

use ndarray::Array4;
use ort::session::Session;
use ort::value::ValueType;
use log::{info, error};

use super::error::ClassifierError;
use super::model::{ClassifierModel, NUM_CLASSES};
use super::preprocess::input_shape;
use crate::runtime::{RuntimeConfig, create_session_builder};

/// A builder for constructing a ClassifierModel with a fluent interface.
#[derive(Debug)]
pub struct ClassifierBuilder {
    model_path: Option<String>,
    session: Option<Session>,
    num_classes: usize,
    runtime_config: RuntimeConfig,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates a new ClassifierBuilder expecting the 39-class plant disease model
    ///
    /// # Example
    /// ```
    /// use plantdoc::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            model_path: None,
            session: None,
            num_classes: NUM_CLASSES,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration for ONNX model execution.
    ///
    /// Must be called before `with_model_file`, which creates the session.
    ///
    /// # Example
    /// ```
    /// use plantdoc::{ClassifierBuilder, RuntimeConfig};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_runtime_config(RuntimeConfig::default().with_intra_threads(2));
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Overrides the number of output classes the model must produce.
    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }

    /// Loads the serialized model from disk.
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - The path is empty
    ///   - A model was already loaded
    ///   - The file doesn't exist
    ///   - ONNX Runtime cannot parse the file
    ///
    /// # Example
    /// ```no_run
    /// use plantdoc::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_model_file("models/plant_disease_model.onnx");
    /// ```
    pub fn with_model_file(mut self, model_path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if model_path.as_os_str().is_empty() {
            return Err(ClassifierError::ModelLoad("Model path cannot be empty".to_string()));
        }
        if self.session.is_some() {
            return Err(ClassifierError::Validation("Model already loaded".to_string()));
        }
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)
            .map_err(|e| {
                error!("Failed to load model from {}: {}", model_path.display(), e);
                ClassifierError::ModelLoad(format!("Failed to load model: {}", e))
            })?;
        info!("Model loaded from {}", model_path.display());

        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.session = Some(session);
        Ok(self)
    }

    /// Builds and returns the final ClassifierModel.
    ///
    /// Validates the declared input/output structure, then runs one probe
    /// forward pass on a zero tensor to confirm the output width.
    ///
    /// # Returns
    /// * `Result<ClassifierModel, ClassifierError>` - The model if successful, or an error if:
    ///   - No model file was loaded
    ///   - The class count is zero
    ///   - The model structure or output width does not match
    pub fn build(mut self) -> Result<ClassifierModel, ClassifierError> {
        if self.num_classes == 0 {
            return Err(ClassifierError::Validation("Number of classes must be positive".to_string()));
        }
        let session = self.session.take()
            .ok_or_else(|| ClassifierError::ModelLoad("No model loaded".to_string()))?;
        let model_path = self.model_path.take()
            .ok_or_else(|| ClassifierError::ModelLoad("No model path set".to_string()))?;

        Self::validate_model(&session, self.num_classes)?;
        info!("Model structure validated successfully");

        let input_name = session.inputs[0].name.clone();
        let model = ClassifierModel {
            model_path,
            session,
            input_name,
            num_classes: self.num_classes,
        };

        let probe = Array4::<f32>::zeros(input_shape());
        let width = model.run_session(probe)
            .map_err(|e| ClassifierError::ModelLoad(format!("Probe forward pass failed: {}", e)))?
            .len();
        if width != self.num_classes {
            return Err(ClassifierError::ModelLoad(format!(
                "Model produces {} scores, expected {} classes",
                width, self.num_classes
            )));
        }
        info!("Model ready: {} classes", model.num_classes);

        Ok(model)
    }

    /// Validates that the model has the expected input/output structure
    ///
    /// # Returns
    /// * `Result<(), ClassifierError>` - Ok if validation passes, or an error if:
    ///   - The model doesn't have exactly one input
    ///   - The input is a tensor whose rank is not 4
    ///   - The model doesn't have any output tensors
    ///   - The first output declares a fixed width other than `num_classes`
    fn validate_model(session: &Session, num_classes: usize) -> Result<(), ClassifierError> {
        let inputs = &session.inputs;
        if inputs.len() != 1 {
            return Err(ClassifierError::ModelLoad(
                format!("Model must have exactly 1 image input, found {}", inputs.len())
            ));
        }
        if let ValueType::Tensor { dimensions, .. } = &inputs[0].input_type {
            if dimensions.len() != 4 {
                return Err(ClassifierError::ModelLoad(
                    format!("Model input must be rank 4 (NCHW), found rank {}", dimensions.len())
                ));
            }
        }

        let outputs = &session.outputs;
        if outputs.is_empty() {
            return Err(ClassifierError::ModelLoad(
                "Model must have at least 1 output for class scores".to_string()
            ));
        }
        if let ValueType::Tensor { dimensions, .. } = &outputs[0].output_type {
            // Negative dimensions are symbolic and only checked by the probe pass
            if let Some(&width) = dimensions.last() {
                if width > 0 && width as usize != num_classes {
                    return Err(ClassifierError::ModelLoad(format!(
                        "Model output has {} classes, expected {}",
                        width, num_classes
                    )));
                }
            }
        }

        Ok(())
    }
}
