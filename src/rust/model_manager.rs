use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

/// File name of the classifier inside the models directory.
pub const DEFAULT_MODEL_FILE: &str = "plant_disease_model.onnx";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not found at {0} and no download URL configured")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {path}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

/// Where the model file lives and how to obtain and verify it.
#[derive(Debug, Clone, Default)]
pub struct ModelSource {
    /// File name inside the models directory
    pub name: String,
    /// URL to fetch the file from when it is missing or fails verification
    pub url: Option<String>,
    /// Expected lowercase hex SHA-256 of the file
    pub sha256: Option<String>,
}

impl ModelSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            sha256: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into().to_lowercase());
        self
    }
}

#[derive(Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("PLANTDOC_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("plantdoc").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("plantdoc").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("plantdoc").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_path(&self, name: &str) -> PathBuf {
        self.models_dir.join(name)
    }

    pub fn is_model_downloaded(&self, name: &str) -> bool {
        let model_path = self.get_model_path(name);
        log::info!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        model_path.exists()
    }

    /// Computes the SHA-256 of a file and compares it with `expected_hash`.
    pub fn verify_file(path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::info!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Verifies the model file against the source's checksum.
    ///
    /// Returns `Ok(false)` if the file is missing. A source without a checksum
    /// only requires the file to exist.
    pub fn verify_model(&self, source: &ModelSource) -> Result<bool, ModelError> {
        let model_path = self.get_model_path(&source.name);
        if !model_path.exists() {
            log::info!("Model file does not exist: {:?}", model_path);
            return Ok(false);
        }
        match &source.sha256 {
            Some(expected) => Self::verify_file(&model_path, expected),
            None => Ok(true),
        }
    }

    pub async fn download_model(&self, source: &ModelSource) -> Result<(), ModelError> {
        let model_path = self.get_model_path(&source.name);
        let url = source.url.as_deref()
            .ok_or_else(|| ModelError::NotDownloaded(model_path.display().to_string()))?;
        let _lock = self.download_lock.lock().await;

        log::info!("Downloading model from {} to {:?}", url, model_path);
        let response = reqwest::get(url).await?.error_for_status()?;
        log::info!("Download response status: {}", response.status());
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected) = &source.sha256 {
            let hash = sha256_hex(&bytes);
            if !hash.eq_ignore_ascii_case(expected) {
                log::error!("Model hash mismatch: expected {}, got {}", expected, hash);
                return Err(ModelError::HashMismatch {
                    path: model_path.display().to_string(),
                    expected: expected.clone(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = model_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&model_path, &bytes)?;

        // Verify after writing
        if !self.verify_model(source)? {
            let _ = self.remove_download(&source.name);
            return Err(ModelError::VerificationFailed);
        }

        log::info!("Model downloaded and verified successfully");
        Ok(())
    }

    pub fn remove_download(&self, name: &str) -> Result<(), ModelError> {
        let model_path = self.get_model_path(name);
        if model_path.exists() {
            fs::remove_file(&model_path)?;
        }
        Ok(())
    }

    /// Ensures that the model file is present and verified, downloading it if
    /// a URL is configured. Returns the path to load the model from.
    pub async fn ensure_model_downloaded(&self, source: &ModelSource) -> Result<PathBuf, ModelError> {
        let model_path = self.get_model_path(&source.name);
        log::info!("Checking model {:?}...", model_path);

        if self.verify_model(source)? {
            log::info!("Model verification successful");
            return Ok(model_path);
        }

        if model_path.exists() {
            let expected = source.sha256.clone().unwrap_or_default();
            if source.url.is_none() {
                let actual = sha256_hex(&fs::read(&model_path)?);
                return Err(ModelError::HashMismatch {
                    path: model_path.display().to_string(),
                    expected,
                    actual,
                });
            }
            log::warn!("Model verification failed, re-downloading...");
            self.remove_download(&source.name)?;
        }

        self.download_model(source).await?;
        Ok(model_path)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
