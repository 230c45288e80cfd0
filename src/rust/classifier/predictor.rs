use std::sync::Arc;

use log::{debug, error};

use super::decision::decide;
use super::error::ClassifierError;
use super::model::ScoreModel;
use super::preprocess::preprocess;

/// Outcome of one prediction call.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// The pipeline ran to completion; the index is already bounds-checked.
    Classified(usize),
    /// Something failed before a score vector was available.
    Degraded { cause: String },
}

impl Prediction {
    /// The class index to report. Degraded predictions always map to class 0.
    pub fn class_index(&self) -> usize {
        match self {
            Self::Classified(index) => *index,
            Self::Degraded { .. } => 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// The prediction boundary: bytes in, bounded class index out.
///
/// Holds a shared handle to the model; cloning is cheap and every clone
/// evaluates against the same read-only parameters.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn ScoreModel>,
}

impl Predictor {
    pub fn new(model: Arc<dyn ScoreModel>) -> Self {
        Self { model }
    }

    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    /// Runs decode, preprocessing and the forward pass, propagating failures.
    pub fn try_predict(&self, bytes: &[u8]) -> Result<usize, ClassifierError> {
        let tensor = preprocess(bytes)?;
        let scores = self.model.forward(tensor)?;
        let index = decide(&scores, self.model.num_classes());
        debug!("Predicted class {} from {} scores", index, scores.len());
        Ok(index)
    }

    /// Classifies an upload without ever returning an error.
    ///
    /// Failures are logged and reported as `Prediction::Degraded`.
    pub fn classify(&self, bytes: &[u8]) -> Prediction {
        match self.try_predict(bytes) {
            Ok(index) => Prediction::Classified(index),
            Err(e) => {
                error!("Error in prediction: {}", e);
                Prediction::Degraded { cause: e.to_string() }
            }
        }
    }

    /// Class index for an upload; any failure yields class 0.
    pub fn predict(&self, bytes: &[u8]) -> usize {
        self.classify(bytes).class_index()
    }
}
