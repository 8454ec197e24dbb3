use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use crate::classifier::artifact::sha256_hex;
use crate::config::ServiceConfig;
use crate::models::{BuiltinModel, DownloadInfo};

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

/// Keeps embedding model files in a local directory, downloading and verifying them on demand.
#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a ModelManager under the service cache directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(ServiceConfig::default_cache_dir().join("models"))
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

    pub fn get_model_path(&self, model: BuiltinModel) -> PathBuf {
        self.models_dir.join(model.download_info().name).join("model.onnx")
    }

    pub fn get_tokenizer_path(&self, model: BuiltinModel) -> PathBuf {
        self.models_dir.join(model.download_info().name).join("tokenizer.json")
    }

    pub fn is_model_downloaded(&self, model: BuiltinModel) -> bool {
        let model_path = self.get_model_path(model);
        let tokenizer_path = self.get_tokenizer_path(model);
        debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        debug!("Tokenizer path: {:?} (exists: {})", tokenizer_path, tokenizer_path.exists());
        model_path.exists() && tokenizer_path.exists()
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        let hash = sha256_hex(&fs::read(path)?);
        debug!("Hash of {:?}: {} (expected {})", path, hash, expected_hash);
        Ok(hash == expected_hash)
    }

    /// Whether both files exist and match their published hashes.
    pub fn verify_model(&self, model: BuiltinModel) -> Result<bool, ModelError> {
        let info = model.download_info();
        let model_path = self.get_model_path(model);
        let tokenizer_path = self.get_tokenizer_path(model);

        if !model_path.exists() || !tokenizer_path.exists() {
            return Ok(false);
        }

        let model_ok = self.verify_file(&model_path, &info.model_hash)?;
        let tokenizer_ok = self.verify_file(&tokenizer_path, &info.tokenizer_hash)?;
        info!(
            "Verification of {}: model {}, tokenizer {}",
            info.name, model_ok, tokenizer_ok
        );
        Ok(model_ok && tokenizer_ok)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: &str,
        file_type: &str,
    ) -> Result<(), ModelError> {
        info!("Downloading {} file from {} to {:?}", file_type, url, path);
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        info!("Downloaded {} bytes", bytes.len());

        let hash = sha256_hex(&bytes);
        if hash != expected_hash {
            error!("{} hash mismatch: expected {}, got {}", file_type, expected_hash, hash);
            return Err(ModelError::HashMismatch {
                file_type: file_type.to_string(),
                expected: expected_hash.to_string(),
                actual: hash,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        if !self.verify_file(path, expected_hash)? {
            return Err(ModelError::VerificationFailed);
        }
        info!("{} file downloaded and verified", file_type);
        Ok(())
    }

    async fn ensure_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: &str,
        file_type: &str,
    ) -> Result<(), ModelError> {
        if path.exists() {
            if self.verify_file(path, expected_hash)? {
                return Ok(());
            }
            warn!("{} file at {:?} failed verification, redownloading", file_type, path);
        }
        self.download_and_verify_file(url, path, expected_hash, file_type)
            .await
    }

    /// Downloads whatever files of `model` are missing or fail verification.
    pub async fn download_model(&self, model: BuiltinModel) -> Result<(), ModelError> {
        let info: DownloadInfo = model.download_info();
        let _lock = self.download_lock.lock().await;

        let model_dir = self.models_dir.join(&info.name);
        fs::create_dir_all(&model_dir)?;

        let result = async {
            self.ensure_file(&info.model_url, &self.get_model_path(model), &info.model_hash, "model")
                .await?;
            self.ensure_file(
                &info.tokenizer_url,
                &self.get_tokenizer_path(model),
                &info.tokenizer_hash,
                "tokenizer",
            )
            .await
        }
        .await;

        if let Err(e) = &result {
            error!("Failed to set up {}: {}", info.name, e);
            let _ = self.remove_download(model);
        }
        result
    }

    pub fn remove_download(&self, model: BuiltinModel) -> Result<(), ModelError> {
        for path in [self.get_model_path(model), self.get_tokenizer_path(model)] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified, fetching it again when
    /// verification fails.
    pub async fn ensure_model_downloaded(&self, model: BuiltinModel) -> Result<(), ModelError> {
        if self.is_model_downloaded(model) && self.verify_model(model)? {
            info!("Model {:?} already downloaded and verified", model);
            return Ok(());
        }
        info!("Fetching model {:?}...", model);
        self.download_model(model).await
    }

    /// Fails with `NotDownloaded` unless both files are present.
    pub fn require_downloaded(&self, model: BuiltinModel) -> Result<(), ModelError> {
        if self.is_model_downloaded(model) {
            Ok(())
        } else {
            Err(ModelError::NotDownloaded(model.download_info().name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_under_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path().join("models")).unwrap();
        let model_path = manager.get_model_path(BuiltinModel::MiniLM);
        assert!(model_path.starts_with(manager.models_dir()));
        assert!(model_path.ends_with("minilm/model.onnx"));
    }

    #[test]
    fn test_missing_files_are_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        assert!(!manager.is_model_downloaded(BuiltinModel::MiniLM));
        assert!(!manager.verify_model(BuiltinModel::MiniLM).unwrap());
        assert!(matches!(
            manager.require_downloaded(BuiltinModel::MiniLM),
            Err(ModelError::NotDownloaded(_))
        ));
    }

    #[test]
    fn test_tampered_files_fail_verification() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        let model = BuiltinModel::MiniLM;
        fs::create_dir_all(manager.get_model_path(model).parent().unwrap()).unwrap();
        fs::write(manager.get_model_path(model), b"not a model").unwrap();
        fs::write(manager.get_tokenizer_path(model), b"{}").unwrap();

        assert!(manager.is_model_downloaded(model));
        assert!(!manager.verify_model(model).unwrap());

        manager.remove_download(model).unwrap();
        assert!(!manager.is_model_downloaded(model));
    }
}
