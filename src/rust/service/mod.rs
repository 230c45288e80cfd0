//! Process-wide service state and startup validation.
//!
//! Everything expensive is loaded once in [`AppState::initialize`]; request
//! handlers only ever see the resulting immutable state through an `Arc`.

mod report;
mod routes;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::classifier::{ClassifierError, ClassifierModel, Prediction, Predictor, ScoreModel, NUM_CLASSES};
use crate::model_manager::ModelError;
use crate::reference::{ReferenceError, ReferenceTables};
use crate::runtime::RuntimeConfig;

pub use report::{DiagnosisReport, MarketItem};
pub use routes::{health, market, router, sanitize_file_name, submit, ErrorBody, HealthResponse};

/// Default request body limit for uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Fatal configuration problems. The process must not start when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to load model: {0}")]
    ModelLoad(#[source] ClassifierError),
    #[error("Failed to fetch model: {0}")]
    ModelFetch(#[from] ModelError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("Model produces {model} classes but reference tables have {tables} rows")]
    ClassCountMismatch { model: usize, tables: usize },
    #[error("Cannot create upload directory {}: {source}", .path.display())]
    UploadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything needed to bring the service up.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub disease_table: PathBuf,
    pub supplement_table: PathBuf,
    pub num_classes: usize,
    pub runtime: RuntimeConfig,
    /// Where uploaded images are kept for display; `None` keeps nothing
    pub upload_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    pub fn new(
        model_path: impl Into<PathBuf>,
        disease_table: impl Into<PathBuf>,
        supplement_table: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            disease_table: disease_table.into(),
            supplement_table: supplement_table.into(),
            num_classes: NUM_CLASSES,
            runtime: RuntimeConfig::default(),
            upload_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub predictor: Predictor,
    pub tables: Arc<ReferenceTables>,
    pub upload_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Loads tables and model, and checks that they agree on the class count.
    ///
    /// # Errors
    /// Any missing or malformed artifact, or a class count mismatch, is a
    /// `StartupError`; no partially initialized state is ever returned.
    pub fn initialize(config: &ServiceConfig) -> Result<Self, StartupError> {
        let tables = ReferenceTables::load(&config.disease_table, &config.supplement_table)?;

        let model = ClassifierModel::builder()
            .with_runtime_config(config.runtime.clone())
            .with_num_classes(config.num_classes)
            .with_model_file(&config.model_path)
            .and_then(|builder| builder.build())
            .map_err(StartupError::ModelLoad)?;
        info!("Classifier: {:?}", model.info());

        let mut state = Self::new(Arc::new(model), tables)?;
        state.max_upload_bytes = config.max_upload_bytes;
        match &config.upload_dir {
            Some(dir) => state.with_upload_dir(dir),
            None => Ok(state),
        }
    }

    /// Wires an already loaded model to the reference tables.
    pub fn new(model: Arc<dyn ScoreModel>, tables: ReferenceTables) -> Result<Self, StartupError> {
        if model.num_classes() != tables.len() {
            return Err(StartupError::ClassCountMismatch {
                model: model.num_classes(),
                tables: tables.len(),
            });
        }
        Ok(Self {
            predictor: Predictor::new(model),
            tables: Arc::new(tables),
            upload_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    /// Enables upload retention, creating the directory if needed.
    pub fn with_upload_dir(mut self, dir: impl AsRef<Path>) -> Result<Self, StartupError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| StartupError::UploadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        self.upload_dir = Some(dir.to_path_buf());
        Ok(self)
    }

    pub fn num_classes(&self) -> usize {
        self.predictor.num_classes()
    }

    /// Classifies an upload and assembles the result record.
    ///
    /// Never fails: a degraded prediction yields the error record.
    pub fn diagnose(&self, bytes: &[u8]) -> DiagnosisReport {
        match self.predictor.classify(bytes) {
            Prediction::Classified(index) => DiagnosisReport::from_tables(&self.tables, index),
            Prediction::Degraded { cause } => {
                warn!("Returning error record: {}", cause);
                DiagnosisReport::error(cause)
            }
        }
    }
}
