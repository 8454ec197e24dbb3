use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::{debug, info};
use serde_json::json;

use super::error::ApiError;
use super::types::{BatchPredictRequest, HealthSnapshot, PredictRequest};
use super::AppState;
use crate::wrapper::{BatchResult, ModelInfo, PredictionResult};

const PREVIEW_CHARS: usize = 50;

fn preview(text: &str) -> String {
    let mut shown: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        shown.push_str("...");
    }
    shown
}

pub(super) async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Text sentiment classification service",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "model_info": "/model/info",
    }))
}

pub(super) async fn health(State(state): State<Arc<AppState>>) -> Json<HealthSnapshot> {
    let snapshot = HealthSnapshot::from(state.model.describe());
    debug!("Health check: {:?}", snapshot.status);
    Json(snapshot)
}

pub(super) async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    Json(state.model.describe())
}

pub(super) async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(request) = payload?;
    let text = request.validate()?;
    info!("Received prediction request for text: {}", preview(&text));

    let model = Arc::clone(&state.model);
    let result = tokio::task::spawn_blocking(move || model.predict(&text)).await??;
    Ok(Json(result))
}

pub(super) async fn predict_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchPredictRequest>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(request) = payload?;
    let texts = request.validate()?;
    info!("Received batch prediction request for {} texts", texts.len());

    let model = Arc::clone(&state.model);
    let result = tokio::task::spawn_blocking(move || model.predict_batch(&texts)).await??;
    Ok(Json(result))
}

pub(super) async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<ModelInfo>, ApiError> {
    info!("Model reload requested");
    let model = Arc::clone(&state.model);
    let info = tokio::task::spawn_blocking(move || model.load()).await??;
    Ok(Json(info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "ñ".repeat(60);
        let shown = preview(&text);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert_eq!(preview("corto"), "corto");
    }
}
