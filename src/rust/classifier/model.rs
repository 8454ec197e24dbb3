use std::collections::{BTreeMap, HashSet};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::logistic::{LogisticConfig, LogisticRegression};
use super::tfidf::{TfidfConfig, TfidfVectorizer};
use super::TextClassifier;

/// TF-IDF features fed into a multinomial logistic regression.
///
/// This is the default backend and the only one that can be persisted as a JSON artifact.
/// It is immutable once built, so it can be shared across threads behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfClassifier {
    labels: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    descriptions: BTreeMap<String, String>,
    vectorizer: TfidfVectorizer,
    regression: LogisticRegression,
}

impl TfidfClassifier {
    pub const MODEL_TYPE: &'static str = "TF-IDF + Logistic Regression";

    /// Trains on labelled documents. `labels` must be sorted and unique; `targets[i]`
    /// indexes into `labels` for `documents[i]`.
    pub(crate) fn train(
        labels: Vec<String>,
        documents: &[String],
        targets: &[usize],
        tfidf_config: TfidfConfig,
        logistic_config: &LogisticConfig,
    ) -> Result<Self, ClassifierError> {
        let vectorizer = TfidfVectorizer::fit(documents, tfidf_config)?;

        let mut features = Array2::<f64>::zeros((documents.len(), vectorizer.vocabulary_size()));
        for (mut row, doc) in features.rows_mut().into_iter().zip(documents) {
            row.assign(&vectorizer.transform(doc));
        }

        let regression = LogisticRegression::fit(&features, targets, labels.len(), logistic_config)?;
        log::info!(
            "Trained {} on {} documents ({} features, {} classes)",
            Self::MODEL_TYPE,
            documents.len(),
            vectorizer.vocabulary_size(),
            labels.len()
        );

        let model = Self {
            labels,
            descriptions: BTreeMap::new(),
            vectorizer,
            regression,
        };
        model.validate().map_err(ClassifierError::Build)?;
        Ok(model)
    }

    /// Attaches the human-readable description of each label.
    pub(crate) fn with_descriptions(mut self, descriptions: BTreeMap<String, String>) -> Self {
        self.descriptions = descriptions;
        self
    }

    /// Checks that labels, vocabulary and weights describe the same feature space.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.labels.len() < 2 {
            return Err(format!("expected at least 2 labels, found {}", self.labels.len()));
        }
        let unique: HashSet<&String> = self.labels.iter().collect();
        if unique.len() != self.labels.len() {
            return Err("labels must be unique".into());
        }
        if self.labels.iter().any(|l| l.trim().is_empty()) {
            return Err("labels must not be empty".into());
        }
        if let Some(label) = self.descriptions.keys().find(|l| !unique.contains(l)) {
            return Err(format!("description given for unknown label '{}'", label));
        }
        self.vectorizer.validate()?;
        self.regression.validate()?;
        if self.regression.n_classes() != self.labels.len() {
            return Err(format!(
                "classifier has {} outputs for {} labels",
                self.regression.n_classes(),
                self.labels.len()
            ));
        }
        if self.regression.n_features() != self.vectorizer.vocabulary_size() {
            return Err(format!(
                "classifier expects {} features but vocabulary has {} terms",
                self.regression.n_features(),
                self.vectorizer.vocabulary_size()
            ));
        }
        Ok(())
    }
}

impl TextClassifier for TfidfClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn feature_count(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    fn model_type(&self) -> &str {
        Self::MODEL_TYPE
    }

    fn description(&self, label: &str) -> Option<&str> {
        self.descriptions.get(label).map(String::as_str)
    }

    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, ClassifierError> {
        let features = self.vectorizer.transform(text);
        self.regression.predict_proba(features.view())
    }
}
