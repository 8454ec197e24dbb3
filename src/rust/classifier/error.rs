use std::io;

/// Represents the different types of errors that can occur while loading or serving a classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The model artifact is missing, corrupt, or structurally incompatible
    #[error("Model load error: {0}")]
    ModelLoad(String),
    /// A prediction was attempted before a model was successfully loaded
    #[error("Model not loaded: load() must succeed before predictions are served")]
    ModelNotLoaded,
    /// The caller supplied text that cannot be classified
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A class definition or builder parameter failed validation
    #[error("Validation error: {0}")]
    Validation(String),
    /// Error occurred during the build phase
    #[error("Build error: {0}")]
    Build(String),
    /// The model produced something it never should have; not the caller's fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClassifierError {
    /// Whether the error was caused by the caller's input rather than the model or service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Validation(_))
    }
}

impl From<io::Error> for ClassifierError {
    fn from(err: io::Error) -> Self {
        ClassifierError::ModelLoad(err.to_string())
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::ModelLoad(format!("malformed artifact: {}", err))
    }
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for ClassifierError {
    fn from(err: ort::Error) -> Self {
        ClassifierError::Build(err.to_string())
    }
}
