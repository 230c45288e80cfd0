//! Plant disease detection from leaf photographs.
//!
//! An uploaded photo is decoded, normalized into a `1x3x224x224` tensor, run
//! through a 39-class ONNX classifier, and the winning class index is used to
//! look up disease and supplement information in two reference tables.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use plantdoc::{AppState, ServiceConfig};
//!
//! let config = ServiceConfig::new(
//!     "plant_disease_model.onnx",
//!     "disease_info.csv",
//!     "supplement_info.csv",
//! );
//! let state = AppState::initialize(&config)?;
//!
//! let report = state.diagnose(&std::fs::read("leaf.jpg")?);
//! println!("{} ({})", report.disease_name, report.class_index);
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Model
//!
//! Startup is strict: a missing or malformed model or table, or tables whose
//! row count differs from the model's class count, is a [`StartupError`].
//! Prediction is lenient: [`Predictor::predict`] never fails and falls back to
//! class 0, logging the cause.

pub mod classifier;
mod runtime;
pub mod model_manager;
pub mod reference;
pub mod service;

pub use classifier::{
    argmax, decide, preprocess, ClassifierBuilder, ClassifierError, ClassifierInfo,
    ClassifierModel, ImageTensor, Prediction, Predictor, ScoreModel, NUM_CLASSES,
};
pub use runtime::RuntimeConfig;
pub use model_manager::{ModelManager, ModelError, ModelSource, DEFAULT_MODEL_FILE};
pub use reference::{DiseaseRecord, ReferenceError, ReferenceTables, SupplementRecord};
pub use service::{AppState, DiagnosisReport, MarketItem, ServiceConfig, SharedState, StartupError};

/// Initializes `env_logger` with an `info` default, overridable through `RUST_LOG`.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
