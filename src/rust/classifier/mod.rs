mod builder;
mod decision;
mod error;
mod model;
mod predictor;
mod preprocess;

pub use builder::ClassifierBuilder;
pub use decision::{argmax, decide};
pub use error::ClassifierError;
pub use model::{ClassifierModel, ScoreModel, NUM_CLASSES};
pub use predictor::{Prediction, Predictor};
pub use preprocess::{
    decode_image, ensure_shape, input_shape, preprocess, rgb_to_tensor, to_model_rgb,
    ImageTensor, INPUT_CHANNELS, INPUT_SIZE, RESIZE_FILTER,
};

/// Summary of a loaded classifier model.
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    pub model_path: String,
    pub input_name: String,
    pub num_classes: usize,
}
