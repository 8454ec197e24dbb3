use std::collections::{BTreeMap, HashMap};

use log::info;
use ndarray::{Array1, Array2};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::builder::TrainingSet;
use super::error::ClassifierError;
use super::utils::{average_vectors, normalize_vector, softmax};
use super::TextClassifier;
use crate::model_manager::ModelManager;
use crate::models::{BuiltinModel, ModelCharacteristics};
use crate::runtime::{create_session_builder, RuntimeConfig};

pub const DEFAULT_TEMPERATURE: f64 = 0.05;

/// Provides text embedding functionality using ONNX models.
///
/// The ONNX model is expected to:
/// - Accept two inputs: input_ids and attention_mask (both shape [batch_size, sequence_length])
/// - Output embeddings of shape [batch_size, sequence_length, embedding_size]
/// - Use the first token's embedding as the sequence embedding
pub(crate) trait TextEmbedding {
    fn tokenizer(&self) -> &Tokenizer;

    fn session(&self) -> &Session;

    fn max_sequence_length(&self) -> usize;

    /// Converts text into token IDs suitable for model input.
    ///
    /// # Errors
    /// - `InvalidInput` if the token length exceeds max_sequence_length
    /// - `Internal` if the text cannot be encoded
    fn tokenize(&self, text: &str) -> Result<Vec<u32>, ClassifierError> {
        let encoding = self
            .tokenizer()
            .encode(text, false)
            .map_err(|e| ClassifierError::Internal(format!("tokenizer failed: {}", e)))?;
        let token_ids = encoding.get_ids();

        let max_length = self.max_sequence_length();
        if token_ids.len() > max_length {
            return Err(ClassifierError::InvalidInput(format!(
                "Input text too long: {} tokens (max: {})",
                token_ids.len(),
                max_length
            )));
        }
        Ok(token_ids.to_vec())
    }

    /// Tokenizes `text` and returns its normalized embedding
    fn embed_text(&self, text: &str) -> Result<Array1<f32>, ClassifierError> {
        let tokens = self.tokenize(text)?;
        self.get_embedding(&tokens)
    }

    /// Runs the model on one sequence and returns the first token's embedding, L2-normalized.
    fn get_embedding(&self, tokens: &[u32]) -> Result<Array1<f32>, ClassifierError> {
        let model_error = |what: &str, e: &dyn std::fmt::Display| {
            ClassifierError::Internal(format!("{}: {}", what, e))
        };

        let input_array = Array2::from_shape_vec((1, tokens.len()), tokens.iter().map(|&x| x as i64).collect())
            .map_err(|e| model_error("Failed to create input array", &e))?;
        let input_dyn = input_array.into_dyn();
        let input_ids = input_dyn.as_standard_layout();

        let mask_array = Array2::from_shape_vec(
            (1, tokens.len()),
            tokens.iter().map(|&x| if x == 0 { 0i64 } else { 1i64 }).collect(),
        )
        .map_err(|e| model_error("Failed to create mask array", &e))?;
        let mask_dyn = mask_array.into_dyn();
        let attention_mask = mask_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            "input_ids",
            Tensor::from_array(&input_ids).map_err(|e| model_error("Failed to create input tensor", &e))?,
        );
        input_tensors.insert(
            "attention_mask",
            Tensor::from_array(&attention_mask).map_err(|e| model_error("Failed to create mask tensor", &e))?,
        );

        let outputs = self
            .session()
            .run(input_tensors)
            .map_err(|e| model_error("Failed to run model", &e))?;
        let output_tensor = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| model_error("Failed to extract output tensor", &e))?;

        let embedding: Array1<f32> = output_tensor.slice(ndarray::s![0, 0, ..]).iter().cloned().collect();
        Ok(normalize_vector(&embedding))
    }
}

/// Prototype classifier over sentence embeddings.
///
/// Each class is represented by the normalized mean embedding of its examples; a text's
/// distribution is the softmax of its cosine similarity to every prototype divided by
/// `temperature`.
#[derive(Debug)]
pub struct EmbeddingClassifier {
    labels: Vec<String>,
    descriptions: BTreeMap<String, String>,
    prototypes: Vec<Array1<f32>>,
    tokenizer: Tokenizer,
    session: Session,
    characteristics: ModelCharacteristics,
    temperature: f64,
}

impl TextEmbedding for EmbeddingClassifier {
    fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn max_sequence_length(&self) -> usize {
        self.characteristics.max_sequence_length
    }
}

impl EmbeddingClassifier {
    pub const MODEL_TYPE: &'static str = "Sentence Embeddings + Prototype Similarity";

    pub(crate) fn from_training_set(
        set: TrainingSet,
        manager: &ModelManager,
        model: BuiltinModel,
        runtime_config: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        manager
            .require_downloaded(model)
            .map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;

        let tokenizer = Tokenizer::from_file(manager.get_tokenizer_path(model))
            .map_err(|e| ClassifierError::ModelLoad(format!("Failed to load tokenizer: {}", e)))?;
        let session = create_session_builder(runtime_config)?
            .commit_from_file(manager.get_model_path(model))?;
        Self::validate_model(&session)?;

        let mut classifier = Self {
            labels: set.labels,
            descriptions: set.descriptions,
            prototypes: Vec::new(),
            tokenizer,
            session,
            characteristics: model.characteristics(),
            temperature: DEFAULT_TEMPERATURE,
        };

        let mut embedded: Vec<Vec<Array1<f32>>> = vec![Vec::new(); classifier.labels.len()];
        for (document, &target) in set.documents.iter().zip(&set.targets) {
            let embedding = classifier
                .embed_text(document)
                .map_err(|e| ClassifierError::Build(format!("Failed to embed example: {}", e)))?;
            embedded[target].push(embedding);
        }

        let embedding_size = classifier.characteristics.embedding_size;
        classifier.prototypes = embedded
            .iter()
            .map(|vectors| normalize_vector(&average_vectors(vectors, embedding_size)))
            .collect();

        info!(
            "Built {} prototypes of size {} for {:?}",
            classifier.prototypes.len(),
            embedding_size,
            model
        );
        Ok(classifier)
    }

    pub fn with_temperature(mut self, temperature: f64) -> Result<Self, ClassifierError> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(ClassifierError::Validation(format!(
                "temperature must be a positive number, got {}",
                temperature
            )));
        }
        self.temperature = temperature;
        Ok(self)
    }

    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        if session.inputs.len() < 2 {
            return Err(ClassifierError::ModelLoad(format!(
                "Model must have at least 2 inputs (input_ids and attention_mask), found {}",
                session.inputs.len()
            )));
        }
        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelLoad(
                "Model must have at least 1 output for embeddings".to_string(),
            ));
        }
        Ok(())
    }
}

impl TextClassifier for EmbeddingClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn feature_count(&self) -> usize {
        self.characteristics.embedding_size
    }

    fn model_type(&self) -> &str {
        Self::MODEL_TYPE
    }

    fn description(&self, label: &str) -> Option<&str> {
        self.descriptions.get(label).map(String::as_str)
    }

    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, ClassifierError> {
        let input = self.embed_text(text)?;
        let logits: Vec<f64> = self
            .prototypes
            .iter()
            .map(|prototype| f64::from(input.dot(prototype)) / self.temperature)
            .collect();
        Ok(softmax(&logits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::corpus::bundled_builder;

    // Needs network access to fetch the model on first run
    #[tokio::test]
    #[ignore]
    async fn test_bundled_prototypes_separate_sentiment() {
        let manager = ModelManager::new_default().unwrap();
        manager.ensure_model_downloaded(BuiltinModel::MiniLM).await.unwrap();

        let set = bundled_builder().unwrap().into_training_set().unwrap();
        let classifier =
            EmbeddingClassifier::from_training_set(set, &manager, BuiltinModel::MiniLM, &RuntimeConfig::default())
                .unwrap();

        let probabilities = classifier.predict_proba("excelente producto").unwrap();
        assert_eq!(probabilities.len(), 2);
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert_eq!(classifier.feature_count(), 384);
        assert!(classifier.description("positivo").is_some());

        let too_long = "palabra ".repeat(1000);
        assert!(matches!(
            classifier.predict_proba(&too_long),
            Err(ClassifierError::InvalidInput(_))
        ));
    }
}
