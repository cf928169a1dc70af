use serde::Serialize;

mod error;
mod builder;
mod clock;
mod service;
pub mod benchmark;
pub mod engine;
pub mod metadata;
pub mod postprocess;
pub mod tokenizer;
pub mod vocabulary;

pub use error::ClassifierError;
pub use builder::{ClassifierConfig, ClassifierServiceBuilder};
pub use clock::{Clock, SystemClock};
pub use service::ClassifierService;
pub use benchmark::BenchmarkResult;

use crate::delegate::Delegate;
use engine::ElementType;

/// Outcome of classifying one piece of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// The winning intent label
    pub intent: String,
    /// Probability of the winning intent (0.0 to 1.0)
    pub confidence: f32,
    /// Wall-clock time of tokenization, inference and postprocessing
    pub inference_time_ms: u64,
    /// Probability of every intent, in label order; sums to 1
    pub all_scores: Vec<f32>,
}

impl ClassificationResult {
    /// Pairs the scores with `labels` and sorts them from most to least likely.
    pub fn ranked<'a>(&self, labels: &'a [String]) -> Vec<(&'a str, f32)> {
        let mut ranked: Vec<(&str, f32)> = labels
            .iter()
            .map(String::as_str)
            .zip(self.all_scores.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// Information about the loaded model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub input_shape: Vec<usize>,
    pub input_type: ElementType,
    pub output_shape: Vec<usize>,
    pub output_type: ElementType,
    /// Number of intent labels
    pub intent_count: usize,
    /// Number of tokens in the vocabulary
    pub vocabulary_size: usize,
    /// Length inputs are padded or truncated to
    pub max_sequence_length: usize,
    /// Hardware delegate in use, `None` when running on CPU
    pub delegate: Option<Delegate>,
    pub model_name: Option<String>,
    pub model_version: Option<String>,
}
