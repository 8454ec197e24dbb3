//! A small inference service for text sentiment classification.
//!
//! A classifier is loaded once into a [`ModelWrapper`], shared across request
//! handlers, and exposed over HTTP by the router from [`create_router`].
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sentiment_service::{ArtifactLoader, InferenceModel, ModelWrapper};
//!
//! let dir = std::env::temp_dir().join("sentiment-service-doc");
//! let model = ModelWrapper::new(ArtifactLoader::new(dir.join("model.json")));
//! model.load()?;
//!
//! let result = model.predict("Este producto es excelente, lo recomiendo mucho")?;
//! println!("{} ({:.2})", result.predicted_label, result.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Predictions only read the loaded model, so the wrapper can be shared through an
//! `Arc` and used from any number of threads, even while a reload is in progress:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sentiment_service::{ArtifactLoader, InferenceModel, ModelWrapper};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let dir = std::env::temp_dir().join("sentiment-service-doc-threads");
//! let model = Arc::new(ModelWrapper::new(ArtifactLoader::new(dir.join("model.json"))));
//! model.load()?;
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let model = Arc::clone(&model);
//!     handles.push(thread::spawn(move || {
//!         model.predict("Excelente calidad").unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod loader;
pub mod service;
pub mod wrapper;
#[cfg(feature = "onnx")]
pub mod model_manager;
#[cfg(feature = "onnx")]
pub mod models;
#[cfg(feature = "onnx")]
mod runtime;

use std::io::Write;

pub use classifier::{ClassDefinition, ClassifierBuilder, ClassifierError, TextClassifier, TfidfClassifier};
pub use config::{Backend, ServiceConfig};
pub use loader::{ArtifactLoader, ModelLoader};
pub use service::{create_router, startup_load, ApiError, AppState, HealthSnapshot, HealthStatus};
pub use wrapper::{BatchResult, InferenceModel, ModelInfo, ModelStatus, ModelWrapper, PredictionResult};

#[cfg(feature = "onnx")]
pub use loader::EmbeddingLoader;
#[cfg(feature = "onnx")]
pub use model_manager::{ModelError, ModelManager};
#[cfg(feature = "onnx")]
pub use models::{BuiltinModel, DownloadInfo, ModelCharacteristics};
#[cfg(feature = "onnx")]
pub use runtime::RuntimeConfig;

/// Initializes `env_logger` with `default_level` unless `RUST_LOG` is set.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger(default_level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} | {} | {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .try_init();
}
