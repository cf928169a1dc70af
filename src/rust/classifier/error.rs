use ort::Error as OrtError;
use std::time::Duration;

/// Represents the different types of errors that can occur in the intent classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// A vocabulary, label or metadata resource is missing, unreadable or empty
    #[error("Failed to load resource '{resource}': {reason}")]
    ResourceLoad { resource: String, reason: String },
    /// The model bytes could not be turned into an inference graph
    #[error("Model load error: {0}")]
    ModelLoad(String),
    /// A hardware delegate could not be attached to the session
    #[error("Failed to attach {delegate} delegate: {reason}")]
    DelegateAttach { delegate: String, reason: String },
    /// The input tensor does not have the shape the model was loaded with
    #[error("Shape mismatch: model expects {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
    /// The classifier was used before `initialize` succeeded or after `dispose`
    #[error("Classifier is not initialized")]
    NotInitialized,
    /// The forward pass itself failed
    #[error("Inference error: {0}")]
    Inference(String),
    /// Invalid arguments
    #[error("Validation error: {0}")]
    Validation(String),
    /// A caller-imposed deadline expired before the result was available
    #[error("Classification did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

impl ClassifierError {
    pub(crate) fn resource(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResourceLoad {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable numeric code used across the C ABI.
    pub fn code(&self) -> i32 {
        match self {
            Self::ResourceLoad { .. } => 1,
            Self::ModelLoad(_) => 2,
            Self::DelegateAttach { .. } => 3,
            Self::ShapeMismatch { .. } => 4,
            Self::NotInitialized => 5,
            Self::Inference(_) => 6,
            Self::Validation(_) => 7,
            Self::DeadlineExceeded(_) => 8,
        }
    }

    /// Short text a chat surface can show in place of an answer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotInitialized => "The assistant is still starting up. Please try again in a moment.",
            Self::ResourceLoad { .. } | Self::ModelLoad(_) => {
                "The on-device model could not be loaded."
            }
            Self::DeadlineExceeded(_) => "That took too long to understand. Please try again.",
            _ => "Sorry, I couldn't understand that message.",
        }
    }

    /// Returns true for errors that only affect the call that produced them.
    pub fn is_per_call(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::Inference(_) | Self::DeadlineExceeded(_)
        )
    }
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelLoad(err.to_string())
    }
}
