//! Process configuration, read once at startup from flags or the environment.

use std::env;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::loader::{ArtifactLoader, ModelLoader};

pub const DEFAULT_ARTIFACT_NAME: &str = "text_classifier.json";

/// Which classifier implementation to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// TF-IDF features with logistic regression, persisted as a JSON artifact
    Tfidf,
    /// Sentence-embedding prototypes on ONNX Runtime (requires the `onnx` feature)
    Embedding,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "HTTP inference service for text sentiment classification", long_about = None)]
pub struct ServiceConfig {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "SENTIMENT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP listener to
    #[arg(short, long, env = "SENTIMENT_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Model artifact to load [default: <cache dir>/text_classifier.json]
    #[arg(long, env = "SENTIMENT_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Fail the load instead of training the bundled model when the artifact is missing
    #[arg(long, env = "SENTIMENT_NO_FALLBACK")]
    pub no_fallback: bool,

    /// Classifier implementation
    #[arg(long, value_enum, env = "SENTIMENT_BACKEND", default_value_t = Backend::Tfidf)]
    pub backend: Backend,

    /// Default log filter; RUST_LOG takes precedence when set
    #[arg(long, env = "SENTIMENT_LOG", default_value = "info")]
    pub log_level: String,
}

impl ServiceConfig {
    /// Returns the cache directory for models and artifacts
    pub fn default_cache_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("SENTIMENT_CACHE") {
            return PathBuf::from(path);
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("sentiment-service");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("sentiment-service");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("sentiment-service")
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| Self::default_cache_dir().join(DEFAULT_ARTIFACT_NAME))
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    /// The TF-IDF artifact loader described by this configuration.
    pub fn artifact_loader(&self) -> ArtifactLoader {
        ArtifactLoader::new(self.artifact_path()).train_if_missing(!self.no_fallback)
    }

    /// Builds the loader for the configured backend. The embedding backend downloads
    /// its model files here; a failed download is logged and left for `load()` to report.
    ///
    /// # Errors
    /// Fails only when the backend is not compiled into this binary.
    pub async fn loader(&self) -> anyhow::Result<Box<dyn ModelLoader>> {
        match self.backend {
            Backend::Tfidf => Ok(Box::new(self.artifact_loader())),
            #[cfg(not(feature = "onnx"))]
            Backend::Embedding => {
                anyhow::bail!("the embedding backend requires building with the `onnx` feature")
            }
            #[cfg(feature = "onnx")]
            Backend::Embedding => {
                use crate::loader::EmbeddingLoader;
                use crate::model_manager::ModelManager;
                use crate::models::BuiltinModel;

                let manager = ModelManager::new(Self::default_cache_dir().join("models"))?;
                let loader = EmbeddingLoader::new(manager, BuiltinModel::MiniLM);
                if let Err(e) = loader.prepare().await {
                    log::error!("Failed to download embedding model: {}", e);
                }
                Ok(Box::new(loader))
            }
        }
    }
}
