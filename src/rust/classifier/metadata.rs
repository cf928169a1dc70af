use log::warn;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::vocabulary::IntentLabels;

/// Descriptor written next to the model by the export step.
///
/// Every field is optional so older exports still parse; unknown fields are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    pub model_name: Option<String>,
    pub model_version: Option<String>,
    pub input_shape: Option<Vec<usize>>,
    pub output_shape: Option<Vec<usize>>,
    pub class_names: Option<Vec<String>>,
    pub max_sequence_length: Option<usize>,
    pub vocab_size: Option<usize>,
}

impl ModelMetadata {
    pub fn from_json(name: &str, bytes: &[u8]) -> Result<Self, ClassifierError> {
        serde_json::from_slice(bytes).map_err(|e| ClassifierError::resource(name, e))
    }

    /// Checks the export's class list against the labels in use.
    ///
    /// A different label order silently mislabels every prediction, so any
    /// difference is an error.
    pub fn check_labels(&self, name: &str, intents: &IntentLabels) -> Result<(), ClassifierError> {
        match &self.class_names {
            Some(classes) if classes.as_slice() != intents.as_slice() => Err(ClassifierError::resource(
                name,
                format!(
                    "class_names {:?} do not match intent labels {:?}",
                    classes,
                    intents.as_slice()
                ),
            )),
            _ => Ok(()),
        }
    }

    pub fn warn_on_sequence_length(&self, max_sequence_length: usize) {
        if let Some(exported) = self.max_sequence_length {
            if exported != max_sequence_length {
                warn!(
                    "Model was exported with sequence length {}, encoding with {}",
                    exported, max_sequence_length
                );
            }
        }
    }
}
