//! Strategies for producing a classifier when the service (re)loads its model.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::classifier::corpus::bundled_builder;
use crate::classifier::{artifact, ClassifierError, TextClassifier, TfidfClassifier};

/// Produces a ready-to-serve classifier.
///
/// A loader is called once at startup and again on every reload. It must either return
/// a fully constructed classifier or an error; it never touches the serving state.
pub trait ModelLoader: Send + Sync {
    /// Algorithm name reported before any model has been loaded
    fn model_type(&self) -> &str;

    fn load(&self) -> Result<Arc<dyn TextClassifier>, ClassifierError>;
}

/// Loads a TF-IDF artifact from disk, optionally training the bundled model when the
/// artifact does not exist yet.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    path: PathBuf,
    train_if_missing: bool,
}

impl ArtifactLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            train_if_missing: true,
        }
    }

    /// Whether a missing artifact is replaced by a freshly trained bundled model
    pub fn train_if_missing(mut self, enabled: bool) -> Self {
        self.train_if_missing = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn train_fallback(&self) -> Result<TfidfClassifier, ClassifierError> {
        bundled_builder()
            .and_then(|builder| builder.build())
            .map_err(|e| ClassifierError::ModelLoad(format!("failed to train bundled model: {}", e)))
    }
}

impl ModelLoader for ArtifactLoader {
    fn model_type(&self) -> &str {
        TfidfClassifier::MODEL_TYPE
    }

    fn load(&self) -> Result<Arc<dyn TextClassifier>, ClassifierError> {
        if self.path.exists() {
            let model = artifact::load(&self.path)?;
            info!("Model loaded from {}", self.path.display());
            return Ok(Arc::new(model));
        }

        if !self.train_if_missing {
            return Err(ClassifierError::ModelLoad(format!(
                "model artifact not found at {}",
                self.path.display()
            )));
        }

        warn!(
            "Model artifact not found at {}. Training bundled example model...",
            self.path.display()
        );
        let model = self.train_fallback()?;
        match artifact::save(&model, &self.path) {
            Ok(()) => info!("Bundled model saved to {}", self.path.display()),
            Err(e) => warn!("Could not save bundled model to {}: {}", self.path.display(), e),
        }
        Ok(Arc::new(model))
    }
}

#[cfg(feature = "onnx")]
pub use embedding_loader::EmbeddingLoader;

#[cfg(feature = "onnx")]
mod embedding_loader {
    use std::sync::Arc;

    use log::info;

    use super::ModelLoader;
    use crate::classifier::corpus::bundled_builder;
    use crate::classifier::embedding::EmbeddingClassifier;
    use crate::classifier::{ClassifierError, TextClassifier};
    use crate::model_manager::ModelManager;
    use crate::models::BuiltinModel;
    use crate::runtime::RuntimeConfig;

    /// Builds a prototype classifier over sentence embeddings of the bundled corpus.
    #[derive(Clone)]
    pub struct EmbeddingLoader {
        manager: ModelManager,
        model: BuiltinModel,
        runtime_config: RuntimeConfig,
    }

    impl EmbeddingLoader {
        pub fn new(manager: ModelManager, model: BuiltinModel) -> Self {
            Self {
                manager,
                model,
                runtime_config: RuntimeConfig::default(),
            }
        }

        pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
            self.runtime_config = config;
            self
        }

        /// Downloads the model files if needed. Call before the first `load()`.
        pub async fn prepare(&self) -> Result<(), crate::model_manager::ModelError> {
            self.manager.ensure_model_downloaded(self.model).await
        }
    }

    impl ModelLoader for EmbeddingLoader {
        fn model_type(&self) -> &str {
            EmbeddingClassifier::MODEL_TYPE
        }

        fn load(&self) -> Result<Arc<dyn TextClassifier>, ClassifierError> {
            let set = bundled_builder()?.into_training_set()?;
            let classifier = EmbeddingClassifier::from_training_set(
                set,
                &self.manager,
                self.model,
                &self.runtime_config,
            )?;
            info!("Embedding classifier ready ({:?})", self.model);
            Ok(Arc::new(classifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_without_fallback_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ArtifactLoader::new(dir.path().join("model.json")).train_if_missing(false);
        assert!(matches!(loader.load(), Err(ClassifierError::ModelLoad(_))));
    }

    #[test]
    fn test_missing_artifact_trains_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ArtifactLoader::new(dir.path().join("model.json"));

        let first = loader.load().unwrap();
        assert!(loader.path().exists());
        assert_eq!(first.labels(), ["negativo", "positivo"]);

        let second = loader.load().unwrap();
        assert_eq!(second.feature_count(), first.feature_count());
        assert_eq!(
            second.predict_proba("excelente").unwrap(),
            first.predict_proba("excelente").unwrap()
        );
    }

    #[test]
    fn test_corrupt_artifact_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loader = ArtifactLoader::new(&path);
        assert!(matches!(loader.load(), Err(ClassifierError::ModelLoad(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_unwritable_artifact_location_still_serves() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // Parent "directory" is a regular file, so saving fails
        let loader = ArtifactLoader::new(blocker.join("model.json"));
        let model = loader.load().unwrap();
        assert_eq!(model.model_type(), TfidfClassifier::MODEL_TYPE);
    }
}
