use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

const MODEL_FILE_NAME: &str = "model.onnx";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Where a model comes from and what its file must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Cache directory name for the model
    pub name: String,
    /// HTTP(S) location of the ONNX file
    pub model_url: String,
    /// Lower-case hex SHA-256 of the ONNX file
    pub model_hash: String,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, model_url: impl Into<String>, model_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_url: model_url.into(),
            model_hash: model_hash.into().to_lowercase(),
        }
    }
}

/// Hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Local cache of model files laid out as `<models_dir>/<name>/model.onnx`.
#[derive(Clone, Debug)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("IDENTIFRUIT_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("identifruit").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("identifruit").join("models");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("identifruit").join("models")
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
        self.models_dir.join(name).join(MODEL_FILE_NAME)
    }

    pub fn is_model_downloaded(&self, name: &str) -> bool {
        let model_path = self.get_model_path(name);
        log::debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        model_path.exists()
    }

    /// Returns the cached model path, or `NotDownloaded` if it is missing
    pub fn require_model(&self, name: &str) -> Result<PathBuf, ModelError> {
        let model_path = self.get_model_path(name);
        if model_path.exists() {
            Ok(model_path)
        } else {
            Err(ModelError::NotDownloaded(name.to_string()))
        }
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::info!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks the cached model against its expected hash; `Ok(false)` if it is missing
    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        let model_path = self.get_model_path(&info.name);
        if !model_path.exists() {
            log::info!("Model file {:?} does not exist", model_path);
            return Ok(false);
        }
        let ok = self.verify_file(&model_path, &info.model_hash)?;
        log::info!("Model hash verification: {}", ok);
        Ok(ok)
    }

    fn write_verified(&self, bytes: &[u8], path: &Path, expected_hash: &str) -> Result<(), ModelError> {
        let hash = sha256_hex(bytes);
        if !hash.eq_ignore_ascii_case(expected_hash) {
            log::error!("model hash mismatch: expected {}, got {}", expected_hash, hash);
            return Err(ModelError::HashMismatch {
                file_type: "model".to_string(),
                expected: expected_hash.to_string(),
                actual: hash,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        log::info!("Writing {} bytes to {:?}", bytes.len(), path);
        fs::write(path, bytes)?;

        if !self.verify_file(path, expected_hash)? {
            return Err(ModelError::VerificationFailed);
        }
        Ok(())
    }

    /// Copies a local model file into the cache after checking its hash
    pub fn install_from_file<P: AsRef<Path>>(&self, info: &ModelInfo, source: P) -> Result<PathBuf, ModelError> {
        let source = source.as_ref();
        log::info!("Installing model '{}' from {:?}", info.name, source);
        let bytes = fs::read(source)?;
        let model_path = self.get_model_path(&info.name);
        self.write_verified(&bytes, &model_path, &info.model_hash)?;
        log::info!("Model '{}' installed at {:?}", info.name, model_path);
        Ok(model_path)
    }

    /// Downloads the model, verifying its hash before and after writing it to the cache.
    /// An existing file that still verifies is left untouched.
    pub async fn download_model(&self, info: &ModelInfo) -> Result<PathBuf, ModelError> {
        let _lock = self.download_lock.lock().await;

        let model_path = self.get_model_path(&info.name);
        if model_path.exists() {
            log::info!("Model file exists at {:?}, verifying...", model_path);
            if self.verify_file(&model_path, &info.model_hash)? {
                log::info!("Existing model file verified successfully");
                return Ok(model_path);
            }
            log::warn!("Model file verification failed, redownloading");
        }

        log::info!("Downloading model from {} to {:?}", info.model_url, model_path);
        let result = async {
            let response = reqwest::get(&info.model_url).await?.error_for_status()?;
            log::info!("Download response status: {}", response.status());
            let bytes = response.bytes().await?;
            log::info!("Downloaded {} bytes", bytes.len());
            self.write_verified(&bytes, &model_path, &info.model_hash)
        }
        .await;

        match result {
            Ok(()) => {
                log::info!("Model downloaded and verified successfully");
                Ok(model_path)
            }
            Err(e) => {
                log::error!("Failed to set up model file: {}", e);
                // Cleanup on failure
                let _ = self.remove_download(&info.name);
                Err(e)
            }
        }
    }

    pub fn remove_download(&self, name: &str) -> Result<(), ModelError> {
        let model_path = self.get_model_path(name);
        if model_path.exists() {
            fs::remove_file(&model_path)?;
        }
        Ok(())
    }

    /// Ensures that a model is present and verified, downloading it if needed.
    pub async fn ensure_model_downloaded(&self, info: &ModelInfo) -> Result<PathBuf, ModelError> {
        log::info!("Checking if model '{}' is downloaded...", info.name);
        if self.is_model_downloaded(&info.name) && self.verify_model(info)? {
            log::info!("Model verification successful");
            return Ok(self.get_model_path(&info.name));
        }
        self.download_model(info).await
    }
}
