mod error;
mod utils;
pub mod artifact;
pub mod builder;
pub mod corpus;
pub mod logistic;
pub mod model;
pub mod tfidf;
#[cfg(feature = "onnx")]
pub mod embedding;

pub use builder::{ClassDefinition, ClassifierBuilder};
pub use error::ClassifierError;
pub use model::TfidfClassifier;

pub(crate) use utils::{argmax, softmax};

/// A trained text classifier: the replaceable learning algorithm behind the service.
///
/// Implementations must be immutable after construction; the service shares one
/// instance across all request handlers.
pub trait TextClassifier: Send + Sync + std::fmt::Debug {
    /// Class labels in the fixed order used by `predict_proba`
    fn labels(&self) -> &[String];

    /// Dimensionality of the feature space the model works in
    fn feature_count(&self) -> usize;

    /// Human-readable name of the algorithm
    fn model_type(&self) -> &str;

    /// What `label` stands for, when the model was trained with descriptions
    fn description(&self, _label: &str) -> Option<&str> {
        None
    }

    /// Probability of each label for `text`, in `labels()` order.
    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, ClassifierError>;
}
