//! HTTP surface of the classifier.
//!
//! ## Endpoints
//!
//! - `GET /` - Service description
//! - `GET /health` - Liveness with model status (always 200)
//! - `POST /predict` - Classify one text
//! - `POST /predict/batch` - Classify up to 100 texts, results in input order
//! - `GET /model/info` - Description of the serving model
//! - `POST /model/reload` - Reload the model; the current one keeps serving if this fails
//!
//! Every route accepts cross-origin requests from any origin.
//!
//! ## Example
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use sentiment_service::{create_router, startup_load, AppState, ArtifactLoader, ModelWrapper};
//!
//! let model = Arc::new(ModelWrapper::new(ArtifactLoader::new("/tmp/text_classifier.json")));
//! startup_load(model.clone()).await;
//! let app = create_router(AppState::new(model));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use log::{error, info};
use tower_http::cors::CorsLayer;

use crate::wrapper::InferenceModel;

mod error;
mod handlers;
pub mod types;

pub use error::ApiError;
pub use types::{ErrorResponse, HealthSnapshot, HealthStatus};

/// Shared state handed to every handler.
pub struct AppState {
    pub model: Arc<dyn InferenceModel>,
}

impl AppState {
    pub fn new(model: Arc<dyn InferenceModel>) -> Arc<Self> {
        Arc::new(Self { model })
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/model/info", get(handlers::model_info))
        .route("/model/reload", post(handlers::reload))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Loads the model once before the listener is bound.
///
/// A failure is logged and swallowed: the service still starts, reporting
/// `unhealthy` and answering predictions with 503 until a reload succeeds.
/// Returns whether the model is loaded.
pub async fn startup_load(model: Arc<dyn InferenceModel>) -> bool {
    info!("Loading model...");
    let outcome = tokio::task::spawn_blocking(move || model.load()).await;
    match outcome {
        Ok(Ok(model_info)) => {
            info!(
                "Model ready: {} with classes {:?}",
                model_info.model_type, model_info.classes
            );
            true
        }
        Ok(Err(e)) => {
            error!("Could not load model, starting in degraded mode: {}", e);
            false
        }
        Err(e) => {
            error!("Model loading task failed, starting in degraded mode: {}", e);
            false
        }
    }
}
