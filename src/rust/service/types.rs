use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::wrapper::{ModelInfo, ModelStatus};

/// Longest text accepted by the prediction endpoints, in characters.
pub const MAX_TEXT_CHARS: usize = 5000;
/// Largest batch accepted by `/predict/batch`.
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchPredictRequest {
    #[serde(default)]
    pub texts: Option<Vec<String>>,
}

fn check_text(text: &str, field: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::Validation(format!("'{}' cannot be empty", field)));
    }
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(ApiError::Validation(format!(
            "'{}' is too long ({} characters, max is {})",
            field, chars, MAX_TEXT_CHARS
        )));
    }
    Ok(())
}

impl PredictRequest {
    /// Returns the text to classify, or the constraint it violates.
    pub fn validate(self) -> Result<String, ApiError> {
        let text = self
            .text
            .ok_or_else(|| ApiError::Validation("field 'text' is required".into()))?;
        check_text(&text, "text")?;
        Ok(text)
    }
}

impl BatchPredictRequest {
    pub fn validate(self) -> Result<Vec<String>, ApiError> {
        let texts = self
            .texts
            .ok_or_else(|| ApiError::Validation("field 'texts' is required".into()))?;
        if texts.is_empty() {
            return Err(ApiError::Validation("'texts' cannot be an empty list".into()));
        }
        if texts.len() > MAX_BATCH_SIZE {
            return Err(ApiError::Validation(format!(
                "'texts' has {} items, max is {}",
                texts.len(),
                MAX_BATCH_SIZE
            )));
        }
        for (i, text) in texts.iter().enumerate() {
            check_text(text, &format!("texts[{}]", i))?;
        }
        Ok(texts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Liveness report. Always served, healthy only when a model is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub model_loaded: bool,
    pub model_info: ModelInfo,
}

impl From<ModelInfo> for HealthSnapshot {
    fn from(model_info: ModelInfo) -> Self {
        let model_loaded = model_info.status == ModelStatus::Loaded;
        Self {
            status: if model_loaded {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            model_loaded,
            model_info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_request_validation() {
        assert!(PredictRequest { text: None }.validate().is_err());
        assert!(PredictRequest { text: Some("  ".into()) }.validate().is_err());
        assert!(PredictRequest { text: Some("x".repeat(MAX_TEXT_CHARS + 1)) }.validate().is_err());
        assert_eq!(
            PredictRequest { text: Some(" hola ".into()) }.validate().unwrap(),
            " hola "
        );
    }

    #[test]
    fn test_batch_request_validation() {
        assert!(BatchPredictRequest { texts: None }.validate().is_err());
        assert!(BatchPredictRequest { texts: Some(vec![]) }.validate().is_err());
        assert!(BatchPredictRequest { texts: Some(vec!["a".into(); MAX_BATCH_SIZE + 1]) }
            .validate()
            .is_err());

        let err = BatchPredictRequest { texts: Some(vec!["ok".into(), "".into()]) }
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("texts[1]"));
    }

    #[test]
    fn test_health_follows_model_status() {
        let info = ModelInfo {
            status: ModelStatus::NotLoaded,
            model_type: "m".into(),
            feature_count: 0,
            classes: vec![],
            descriptions: Default::default(),
        };
        let health = HealthSnapshot::from(info);
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(!health.model_loaded);
    }
}
