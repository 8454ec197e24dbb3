//! The model wrapper: one shared classifier behind a load / predict / batch / describe contract.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::classifier::{argmax, ClassifierError, TextClassifier};
use crate::loader::ModelLoader;

/// Largest allowed deviation of a probability distribution's sum from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Outcome of classifying one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// The input exactly as received
    pub text: String,
    #[serde(rename = "prediction")]
    pub predicted_label: String,
    /// Probability of `predicted_label`
    pub confidence: f64,
    #[serde(rename = "probabilities")]
    pub class_probabilities: BTreeMap<String, f64>,
}

/// Predictions for a batch, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub results: Vec<PredictionResult>,
    pub total_processed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Loaded,
    NotLoaded,
}

/// Description of the model currently serving, or of its absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub status: ModelStatus,
    pub model_type: String,
    #[serde(rename = "features")]
    pub feature_count: usize,
    pub classes: Vec<String>,
    /// Label descriptions the model was trained with
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub descriptions: BTreeMap<String, String>,
}

/// The four operations every servable model offers.
pub trait InferenceModel: Send + Sync {
    /// Loads (or reloads) the model. Safe to call repeatedly.
    fn load(&self) -> Result<ModelInfo, ClassifierError>;

    fn predict(&self, text: &str) -> Result<PredictionResult, ClassifierError>;

    fn predict_batch(&self, texts: &[String]) -> Result<BatchResult, ClassifierError>;

    /// Never fails; reports `not_loaded` when no model is available.
    fn describe(&self) -> ModelInfo;

    fn is_loaded(&self) -> bool {
        self.describe().status == ModelStatus::Loaded
    }
}

/// A loaded classifier and the facts about it fixed at load time.
pub struct ClassifierState {
    classifier: Arc<dyn TextClassifier>,
    vocabulary_size: usize,
    labels: Vec<String>,
}

impl ClassifierState {
    fn new(classifier: Arc<dyn TextClassifier>) -> Result<Self, ClassifierError> {
        let labels = classifier.labels().to_vec();
        if labels.is_empty() {
            return Err(ClassifierError::ModelLoad("model has an empty label set".into()));
        }
        let mut sorted = labels.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != labels.len() {
            return Err(ClassifierError::ModelLoad(format!(
                "model has duplicate labels: {:?}",
                labels
            )));
        }
        Ok(Self {
            vocabulary_size: classifier.feature_count(),
            classifier,
            labels,
        })
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            status: ModelStatus::Loaded,
            model_type: self.classifier.model_type().to_string(),
            feature_count: self.vocabulary_size,
            classes: self.labels.clone(),
            descriptions: self
                .labels
                .iter()
                .filter_map(|label| Some((label.clone(), self.classifier.description(label)?.to_string())))
                .collect(),
        }
    }

    fn classify(&self, text: &str) -> Result<PredictionResult, ClassifierError> {
        let probabilities = self.classifier.predict_proba(text.trim())?;
        self.check_distribution(&probabilities)?;

        let best = argmax(&probabilities)
            .ok_or_else(|| ClassifierError::Internal("model returned no probabilities".into()))?;

        Ok(PredictionResult {
            text: text.to_string(),
            predicted_label: self.labels[best].clone(),
            confidence: probabilities[best],
            class_probabilities: self.labels.iter().cloned().zip(probabilities).collect(),
        })
    }

    fn check_distribution(&self, probabilities: &[f64]) -> Result<(), ClassifierError> {
        if probabilities.len() != self.labels.len() {
            return Err(ClassifierError::Internal(format!(
                "model returned {} probabilities for {} labels",
                probabilities.len(),
                self.labels.len()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ClassifierError::Internal(format!(
                "model returned an invalid distribution: {:?}",
                probabilities
            )));
        }
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ClassifierError::Internal(format!(
                "probabilities sum to {} instead of 1",
                total
            )));
        }
        Ok(())
    }
}

/// Owns the process-wide classifier state.
///
/// Predictions take a snapshot of the current state and run without holding any lock,
/// so any number of them proceed in parallel. `load` builds the replacement outside the
/// lock and swaps it in with a single pointer write: readers see the old model or the
/// new one, never a mix.
pub struct ModelWrapper {
    loader: Box<dyn ModelLoader>,
    state: RwLock<Option<Arc<ClassifierState>>>,
    load_lock: Mutex<()>,
}

impl ModelWrapper {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self::from_boxed(Box::new(loader))
    }

    pub fn from_boxed(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            state: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> Option<Arc<ClassifierState>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn loaded(&self) -> Result<Arc<ClassifierState>, ClassifierError> {
        self.snapshot().ok_or(ClassifierError::ModelNotLoaded)
    }
}

fn require_text(text: &str, what: &str) -> Result<(), ClassifierError> {
    if text.trim().is_empty() {
        return Err(ClassifierError::InvalidInput(format!(
            "{} cannot be empty or whitespace",
            what
        )));
    }
    Ok(())
}

impl InferenceModel for ModelWrapper {
    fn load(&self) -> Result<ModelInfo, ClassifierError> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let start = Instant::now();

        let state = match self.loader.load().and_then(ClassifierState::new) {
            Ok(state) => Arc::new(state),
            Err(e) => {
                let e = match e {
                    e @ ClassifierError::ModelLoad(_) => e,
                    other => ClassifierError::ModelLoad(other.to_string()),
                };
                error!("Failed to load model: {}", e);
                return Err(e);
            }
        };
        let info = state.info();

        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(state);
        info!(
            "Model loaded: {} ({} features, classes {:?}) in {:.2?}",
            info.model_type,
            info.feature_count,
            info.classes,
            start.elapsed()
        );
        Ok(info)
    }

    fn predict(&self, text: &str) -> Result<PredictionResult, ClassifierError> {
        let state = self.loaded()?;
        require_text(text, "text")?;

        let result = state.classify(text)?;
        info!(
            "Prediction: {} (confidence: {:.3})",
            result.predicted_label, result.confidence
        );
        Ok(result)
    }

    fn predict_batch(&self, texts: &[String]) -> Result<BatchResult, ClassifierError> {
        let state = self.loaded()?;
        if texts.is_empty() {
            return Err(ClassifierError::InvalidInput("texts cannot be empty".into()));
        }
        for (i, text) in texts.iter().enumerate() {
            require_text(text, &format!("texts[{}]", i))?;
        }

        let results = texts
            .iter()
            .map(|text| state.classify(text))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Batch prediction completed for {} texts", results.len());

        Ok(BatchResult {
            total_processed: results.len(),
            results,
        })
    }

    fn describe(&self) -> ModelInfo {
        match self.snapshot() {
            Some(state) => state.info(),
            None => ModelInfo {
                status: ModelStatus::NotLoaded,
                model_type: self.loader.model_type().to_string(),
                feature_count: 0,
                classes: Vec::new(),
                descriptions: BTreeMap::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Classifier with fixed probabilities, for exercising the wrapper's checks.
    #[derive(Debug)]
    struct FixedClassifier {
        labels: Vec<String>,
        probabilities: Vec<f64>,
    }

    impl TextClassifier for FixedClassifier {
        fn labels(&self) -> &[String] {
            &self.labels
        }
        fn feature_count(&self) -> usize {
            3
        }
        fn model_type(&self) -> &str {
            "fixed"
        }
        fn predict_proba(&self, _text: &str) -> Result<Vec<f64>, ClassifierError> {
            Ok(self.probabilities.clone())
        }
    }

    struct FixedLoader(Vec<&'static str>, Vec<f64>);

    impl ModelLoader for FixedLoader {
        fn model_type(&self) -> &str {
            "fixed"
        }
        fn load(&self) -> Result<Arc<dyn TextClassifier>, ClassifierError> {
            Ok(Arc::new(FixedClassifier {
                labels: self.0.iter().map(|s| s.to_string()).collect(),
                probabilities: self.1.clone(),
            }))
        }
    }

    fn loaded(labels: Vec<&'static str>, probabilities: Vec<f64>) -> ModelWrapper {
        let wrapper = ModelWrapper::new(FixedLoader(labels, probabilities));
        wrapper.load().unwrap();
        wrapper
    }

    #[test]
    fn test_ties_resolve_to_first_label() {
        let wrapper = loaded(vec!["a", "b"], vec![0.5, 0.5]);
        let result = wrapper.predict("anything").unwrap();
        assert_eq!(result.predicted_label, "a");
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_bad_distribution_is_internal_error() {
        let wrapper = loaded(vec!["a", "b"], vec![0.7, 0.7]);
        assert!(matches!(wrapper.predict("x"), Err(ClassifierError::Internal(_))));

        let wrapper = loaded(vec!["a", "b"], vec![1.0]);
        assert!(matches!(wrapper.predict("x"), Err(ClassifierError::Internal(_))));

        let wrapper = loaded(vec!["a", "b"], vec![f64::NAN, 1.0]);
        assert!(matches!(wrapper.predict("x"), Err(ClassifierError::Internal(_))));
    }

    #[test]
    fn test_duplicate_labels_fail_load() {
        let wrapper = ModelWrapper::new(FixedLoader(vec!["a", "a"], vec![0.5, 0.5]));
        assert!(matches!(wrapper.load(), Err(ClassifierError::ModelLoad(_))));
        assert!(!wrapper.is_loaded());
    }

    #[test]
    fn test_describe_before_load_uses_loader_type() {
        let wrapper = ModelWrapper::new(FixedLoader(vec!["a", "b"], vec![0.5, 0.5]));
        let info = wrapper.describe();
        assert_eq!(info.status, ModelStatus::NotLoaded);
        assert_eq!(info.model_type, "fixed");
        assert_eq!(info.feature_count, 0);
        assert!(info.classes.is_empty());
    }

    #[test]
    fn test_batch_reports_first_invalid_index() {
        let wrapper = loaded(vec!["a", "b"], vec![0.2, 0.8]);
        let texts = vec!["ok".to_string(), " ".to_string(), "".to_string()];
        match wrapper.predict_batch(&texts) {
            Err(ClassifierError::InvalidInput(msg)) => assert!(msg.contains("texts[1]")),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let wrapper = loaded(vec!["a", "b"], vec![0.2, 0.8]);
        let json = serde_json::to_value(wrapper.predict("hola").unwrap()).unwrap();
        assert_eq!(json["prediction"], "b");
        assert_eq!(json["probabilities"]["a"], 0.2);

        let info = serde_json::to_value(wrapper.describe()).unwrap();
        assert_eq!(info["status"], "loaded");
        assert_eq!(info["features"], 3);
    }
}
