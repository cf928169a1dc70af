use std::sync::Arc;

use super::benchmark::DEFAULT_BENCHMARK_PHRASES;
use super::clock::{Clock, SystemClock};
use super::engine::{EngineLoader, OrtEngineLoader};
use super::error::ClassifierError;
use super::service::ClassifierService;
use super::tokenizer::MAX_SEQUENCE_LENGTH;
use crate::assets::{AssetDir, ResourceProvider};
use crate::delegate::PlatformInfoProvider;
use crate::runtime::RuntimeConfig;

/// Names of the bundled resources and preprocessing settings.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Length every input is padded or truncated to
    pub max_sequence_length: usize,
    pub vocabulary_asset: String,
    pub intents_asset: String,
    pub model_asset: String,
    /// Read when present; its absence is not an error
    pub metadata_asset: Option<String>,
    /// Expected SHA-256 of the model bytes, hex encoded
    pub model_sha256: Option<String>,
    pub benchmark_phrases: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: MAX_SEQUENCE_LENGTH,
            vocabulary_asset: "vocab.txt".to_string(),
            intents_asset: "labels.txt".to_string(),
            model_asset: "model.onnx".to_string(),
            metadata_asset: Some("model_metadata.json".to_string()),
            model_sha256: None,
            benchmark_phrases: DEFAULT_BENCHMARK_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A builder for constructing a [`ClassifierService`] with a fluent interface.
///
/// Nothing is loaded here; resources are read by
/// [`ClassifierService::initialize`].
///
/// # Example
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use ondevice_intent::{AssetDir, ClassifierService, HostPlatform};
///
/// let mut service = ClassifierService::builder()
///     .with_resources(AssetDir::new("assets"))
///     .with_platform(HostPlatform)
///     .build()?;
/// service.initialize()?;
/// let result = service.classify("What's the weather like?")?;
/// println!("{} ({:.2})", result.intent, result.confidence);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClassifierServiceBuilder {
    config: ClassifierConfig,
    runtime_config: RuntimeConfig,
    resources: Option<Box<dyn ResourceProvider>>,
    loader: Option<Box<dyn EngineLoader>>,
    platform: Option<Box<dyn PlatformInfoProvider>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ClassifierServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the runtime configuration used by the default ONNX loader
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    pub fn with_max_sequence_length(mut self, length: usize) -> Self {
        self.config.max_sequence_length = length;
        self
    }

    pub fn with_model_hash(mut self, sha256: impl Into<String>) -> Self {
        self.config.model_sha256 = Some(sha256.into());
        self
    }

    pub fn with_benchmark_phrases(mut self, phrases: Vec<impl Into<String>>) -> Self {
        self.config.benchmark_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Where the model, vocabulary and labels are read from. Defaults to
    /// [`AssetDir::new_default`].
    pub fn with_resources(mut self, resources: impl ResourceProvider + 'static) -> Self {
        self.resources = Some(Box::new(resources));
        self
    }

    /// Replaces the ONNX Runtime loader, e.g. with a test double.
    pub fn with_engine_loader(mut self, loader: impl EngineLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Installs the platform provider used to pick a delegate. Without one the
    /// platform is "unknown" and inference runs on CPU.
    pub fn with_platform(mut self, platform: impl PlatformInfoProvider + 'static) -> Self {
        self.platform = Some(Box::new(platform));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validates the configuration and returns an uninitialized service.
    pub fn build(self) -> Result<ClassifierService, ClassifierError> {
        if self.config.max_sequence_length == 0 {
            return Err(ClassifierError::Validation(
                "max_sequence_length must be greater than zero".into(),
            ));
        }
        for (what, name) in [
            ("vocabulary", &self.config.vocabulary_asset),
            ("intents", &self.config.intents_asset),
            ("model", &self.config.model_asset),
        ] {
            if name.is_empty() {
                return Err(ClassifierError::Validation(format!("{} asset name cannot be empty", what)));
            }
        }

        let max_sequence_length = self.config.max_sequence_length;
        let runtime_config = self.runtime_config;
        let use_delegate = runtime_config.use_delegate;

        Ok(ClassifierService::new(
            self.config,
            self.resources.unwrap_or_else(|| Box::new(AssetDir::new_default())),
            self.loader.unwrap_or_else(|| {
                Box::new(OrtEngineLoader::new(runtime_config, max_sequence_length))
            }),
            self.platform,
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            use_delegate,
        ))
    }
}
