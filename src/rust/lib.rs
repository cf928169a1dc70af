//! On-device intent classification for chat assistants.
//!
//! Text is lowercased, split on non-word characters, mapped to vocabulary IDs
//! and padded to a fixed length; an ONNX model turns the IDs into one logit
//! per intent, and a softmax picks the winner. Hardware delegates (NNAPI on
//! Android, CoreML on Apple platforms) are tried first and dropped silently
//! when they cannot be attached.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ondevice_intent::{AssetDir, ClassifierService, HostPlatform};
//!
//! let mut service = ClassifierService::builder()
//!     .with_resources(AssetDir::new("assets"))
//!     .with_platform(HostPlatform)
//!     .build()?;
//! service.initialize()?;
//!
//! let result = service.classify("Is it going to rain?")?;
//! println!("{} ({:.1}%, {}ms)", result.intent, result.confidence * 100.0, result.inference_time_ms);
//!
//! let stats = service.benchmark(50)?;
//! println!("median {}ms, p95 {}ms", stats.median_ms, stats.p95_ms);
//!
//! service.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A [`ClassifierService`] is owned by one caller and `classify` takes
//! `&mut self`. Async code shares one through [`SharedClassifier`], which
//! serializes calls and can race a classification against a deadline.

pub mod assets;
pub mod classifier;
pub mod delegate;
pub mod ffi;
mod runtime;
mod shared;

pub use assets::{AssetDir, MemoryAssets, ResourceProvider};
pub use classifier::{
    BenchmarkResult, ClassificationResult, ClassifierConfig, ClassifierError, ClassifierService,
    ClassifierServiceBuilder, Clock, ModelInfo, SystemClock,
};
pub use classifier::engine::{ElementType, EngineLoader, EngineState, InferenceEngine, OrtEngineLoader, TensorSpec};
pub use classifier::postprocess::{argmax, softmax, Prediction};
pub use classifier::tokenizer::{encode, tokenize, MAX_SEQUENCE_LENGTH};
pub use classifier::vocabulary::{load_intents, load_vocabulary, IntentLabels, Vocabulary};
pub use delegate::{select_delegate, Delegate, HostPlatform, PlatformInfoProvider, StaticPlatform};
pub use runtime::RuntimeConfig;
pub use ort::session::builder::GraphOptimizationLevel;
pub use shared::SharedClassifier;

pub fn init_logger() {
    let _ = env_logger::try_init();
}
