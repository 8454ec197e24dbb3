use std::collections::BTreeMap;

use log::info;

use super::error::ClassifierError;
use super::logistic::LogisticConfig;
use super::model::TfidfClassifier;
use super::tfidf::TfidfConfig;

const MAX_CLASSES: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Represents a class definition with required label, description and training examples
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    /// The unique identifier for the class, reported as the predicted label
    pub label: String,
    /// A human-readable description of what this class represents
    pub description: String,
    /// Example texts that belong to this class
    pub examples: Option<Vec<String>>,
}

impl ClassDefinition {
    /// Creates a new class definition with required label and description
    ///
    /// # Example
    /// ```
    /// use sentiment_service::ClassDefinition;
    ///
    /// let class = ClassDefinition::new("positivo", "Opiniones favorables");
    /// ```
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            examples: None,
        }
    }

    /// Adds examples to the class definition
    ///
    /// # Example
    /// ```
    /// use sentiment_service::ClassDefinition;
    ///
    /// let class = ClassDefinition::new("positivo", "Opiniones favorables")
    ///     .with_examples(vec!["Excelente calidad", "Me encanta"]);
    /// ```
    pub fn with_examples(mut self, examples: Vec<impl Into<String>>) -> Self {
        self.examples = Some(examples.into_iter().map(Into::into).collect());
        self
    }
}

/// A builder for training a classifier with a fluent interface.
///
/// Labels are kept in sorted order; that order is the label order of every
/// probability vector the resulting classifier produces.
#[derive(Debug, Default)]
pub struct ClassifierBuilder {
    class_examples: BTreeMap<String, Vec<String>>,
    class_descriptions: BTreeMap<String, String>,
    tfidf_config: TfidfConfig,
    logistic_config: LogisticConfig,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use sentiment_service::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TF-IDF vocabulary settings
    pub fn with_tfidf_config(mut self, config: TfidfConfig) -> Self {
        self.tfidf_config = config;
        self
    }

    /// Sets the logistic regression training settings
    pub fn with_logistic_config(mut self, config: LogisticConfig) -> Self {
        self.logistic_config = config;
        self
    }

    /// Validates class data according to the following rules:
    /// - Label must not be empty
    /// - Description must not be empty and must not exceed 1000 characters
    /// - Must have at least one example
    /// - No example text can be empty or whitespace
    fn validate_class_data(
        label: &str,
        description: &str,
        examples: &[impl AsRef<str>],
    ) -> Result<(), ClassifierError> {
        if label.trim().is_empty() {
            return Err(ClassifierError::Validation("Class label cannot be empty".into()));
        }
        if description.trim().is_empty() {
            return Err(ClassifierError::Validation("Class description cannot be empty".into()));
        }
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ClassifierError::Validation(format!(
                "Class description is too long ({} chars, max is {})",
                description.chars().count(),
                MAX_DESCRIPTION_LENGTH
            )));
        }
        if examples.is_empty() {
            return Err(ClassifierError::Validation(format!(
                "Class '{}' must have at least one example",
                label
            )));
        }
        if let Some(pos) = examples.iter().position(|e| e.as_ref().trim().is_empty()) {
            return Err(ClassifierError::Validation(format!(
                "Example {} cannot be empty",
                pos + 1
            )));
        }
        Ok(())
    }

    /// Adds a class with its label, description and examples
    ///
    /// # Errors
    /// `ClassifierError::Validation` if the class data is invalid, the label was
    /// already added, or the maximum number of classes (100) is exceeded.
    ///
    /// # Example
    /// ```
    /// use sentiment_service::{ClassifierBuilder, ClassDefinition};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .add_class(
    ///         ClassDefinition::new("positivo", "Opiniones favorables")
    ///             .with_examples(vec!["excelente", "me encanta"])
    ///     );
    /// assert!(builder.is_ok());
    /// ```
    pub fn add_class(mut self, class: ClassDefinition) -> Result<Self, ClassifierError> {
        let examples = class.examples.unwrap_or_default();

        Self::validate_class_data(&class.label, &class.description, &examples)?;

        if self.class_examples.contains_key(&class.label) {
            return Err(ClassifierError::Validation(format!(
                "Class '{}' was already added",
                class.label
            )));
        }
        if self.class_examples.len() >= MAX_CLASSES {
            return Err(ClassifierError::Validation(format!(
                "Maximum number of classes ({}) exceeded",
                MAX_CLASSES
            )));
        }

        self.class_examples.insert(class.label.clone(), examples);
        self.class_descriptions.insert(class.label, class.description);

        Ok(self)
    }

    /// Descriptions of the classes added so far, keyed by label
    pub fn class_descriptions(&self) -> &BTreeMap<String, String> {
        &self.class_descriptions
    }

    /// Flattens the classes into sorted labels plus one `(document, label index)` pair per example.
    pub(crate) fn into_training_set(self) -> Result<TrainingSet, ClassifierError> {
        if self.class_examples.len() < 2 {
            return Err(ClassifierError::Build(format!(
                "At least two classes must be added, found {}",
                self.class_examples.len()
            )));
        }

        let labels: Vec<String> = self.class_examples.keys().cloned().collect();
        let mut documents = Vec::new();
        let mut targets = Vec::new();
        for (index, examples) in self.class_examples.into_values().enumerate() {
            for example in examples {
                documents.push(example);
                targets.push(index);
            }
        }

        Ok(TrainingSet {
            labels,
            descriptions: self.class_descriptions,
            documents,
            targets,
            tfidf_config: self.tfidf_config,
            logistic_config: self.logistic_config,
        })
    }

    /// Trains and returns a TF-IDF + logistic regression classifier
    ///
    /// # Errors
    /// `ClassifierError::Build` if fewer than two classes were added or the examples
    /// produce no usable vocabulary.
    ///
    /// # Example
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use sentiment_service::{ClassifierBuilder, ClassDefinition, TextClassifier};
    ///
    /// let classifier = ClassifierBuilder::new()
    ///     .add_class(
    ///         ClassDefinition::new("positivo", "Opiniones favorables")
    ///             .with_examples(vec!["excelente producto", "me encanta"])
    ///     )?
    ///     .add_class(
    ///         ClassDefinition::new("negativo", "Opiniones desfavorables")
    ///             .with_examples(vec!["muy malo", "terrible calidad"])
    ///     )?
    ///     .build()?;
    ///
    /// assert_eq!(classifier.labels(), ["negativo", "positivo"]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<TfidfClassifier, ClassifierError> {
        let set = self.into_training_set()?;
        info!(
            "Training classifier on {} examples across classes {:?}",
            set.documents.len(),
            set.labels
        );
        let classifier = TfidfClassifier::train(
            set.labels,
            &set.documents,
            &set.targets,
            set.tfidf_config,
            &set.logistic_config,
        )?;
        Ok(classifier.with_descriptions(set.descriptions))
    }
}

/// Labelled documents ready for training.
#[derive(Debug)]
pub(crate) struct TrainingSet {
    pub labels: Vec<String>,
    pub descriptions: BTreeMap<String, String>,
    pub documents: Vec<String>,
    pub targets: Vec<usize>,
    pub tfidf_config: TfidfConfig,
    pub logistic_config: LogisticConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_classes() -> ClassifierBuilder {
        ClassifierBuilder::new()
            .add_class(ClassDefinition::new("b", "Second").with_examples(vec!["beta text"]))
            .unwrap()
            .add_class(ClassDefinition::new("a", "First").with_examples(vec!["alpha words", "alpha again"]))
            .unwrap()
    }

    #[test]
    fn test_class_validation() {
        assert!(ClassifierBuilder::new()
            .add_class(ClassDefinition::new("", "Empty label").with_examples(vec!["x"]))
            .is_err());
        assert!(ClassifierBuilder::new()
            .add_class(ClassDefinition::new("label", "").with_examples(vec!["x"]))
            .is_err());
        assert!(ClassifierBuilder::new()
            .add_class(ClassDefinition::new("label", "No examples"))
            .is_err());
        assert!(ClassifierBuilder::new()
            .add_class(ClassDefinition::new("label", "Blank example").with_examples(vec!["  "]))
            .is_err());
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let result = two_classes().add_class(ClassDefinition::new("a", "Again").with_examples(vec!["x"]));
        assert!(matches!(result, Err(ClassifierError::Validation(_))));
    }

    #[test]
    fn test_training_set_uses_sorted_labels() {
        let set = two_classes().into_training_set().unwrap();
        assert_eq!(set.labels, vec!["a", "b"]);
        assert_eq!(set.targets, vec![0, 0, 1]);
        assert_eq!(set.documents[2], "beta text");
        assert_eq!(set.descriptions["a"], "First");
    }

    #[test]
    fn test_built_classifier_keeps_descriptions() {
        use crate::classifier::TextClassifier;

        let classifier = two_classes().build().unwrap();
        assert_eq!(classifier.description("a"), Some("First"));
        assert_eq!(classifier.description("b"), Some("Second"));
        assert_eq!(classifier.description("c"), None);
    }

    #[test]
    fn test_build_requires_two_classes() {
        let result = ClassifierBuilder::new()
            .add_class(ClassDefinition::new("only", "One class").with_examples(vec!["text"]))
            .unwrap()
            .build();
        assert!(matches!(result, Err(ClassifierError::Build(_))));
    }
}
