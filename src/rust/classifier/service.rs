use std::sync::Arc;
use log::{debug, error, info, warn};

use super::benchmark::BenchmarkResult;
use super::builder::{ClassifierConfig, ClassifierServiceBuilder};
use super::clock::Clock;
use super::engine::{EngineLoader, EngineState, InferenceEngine};
use super::error::ClassifierError;
use super::metadata::ModelMetadata;
use super::postprocess::{argmax, softmax};
use super::tokenizer::encode_text;
use super::vocabulary::{load_intents, load_vocabulary, IntentLabels, Vocabulary};
use super::{ClassificationResult, ModelInfo};
use crate::assets::{verify_sha256, ResourceProvider};
use crate::delegate::{load_with_fallback, platform_of, select_delegate, Delegate, PlatformInfoProvider};

/// Everything that exists only between `initialize` and `dispose`.
struct LoadedModel {
    vocabulary: Vocabulary,
    intents: IntentLabels,
    metadata: Option<ModelMetadata>,
    engine: Box<dyn InferenceEngine>,
    delegate: Option<Delegate>,
}

/// Intent classifier owning its vocabulary, labels and inference engine.
///
/// A service starts uninitialized. [`initialize`](Self::initialize) loads the
/// resources and the model; [`dispose`](Self::dispose) releases them again.
/// Every instance is independent, so tests and hosts can run several side by
/// side.
///
/// The engine is not reentrant: `classify` takes `&mut self`. Share a service
/// across tasks through [`SharedClassifier`](crate::SharedClassifier).
pub struct ClassifierService {
    config: ClassifierConfig,
    resources: Box<dyn ResourceProvider>,
    loader: Box<dyn EngineLoader>,
    platform: Option<Box<dyn PlatformInfoProvider>>,
    clock: Arc<dyn Clock>,
    use_delegate: bool,
    loaded: Option<LoadedModel>,
}

// Compile-time verification that a service can move to a worker thread
const _: () = {
    fn assert_send<T: Send>() {}
    fn verify_send() {
        assert_send::<ClassifierService>();
    }
};

impl ClassifierService {
    /// Creates a new ClassifierServiceBuilder for fluent construction
    pub fn builder() -> ClassifierServiceBuilder {
        ClassifierServiceBuilder::new()
    }

    pub(crate) fn new(
        config: ClassifierConfig,
        resources: Box<dyn ResourceProvider>,
        loader: Box<dyn EngineLoader>,
        platform: Option<Box<dyn PlatformInfoProvider>>,
        clock: Arc<dyn Clock>,
        use_delegate: bool,
    ) -> Self {
        Self {
            config,
            resources,
            loader,
            platform,
            clock,
            use_delegate,
            loaded: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.is_some()
    }

    /// Labels in logit order, once initialized.
    pub fn intent_labels(&self) -> Option<&IntentLabels> {
        self.loaded.as_ref().map(|loaded| &loaded.intents)
    }

    /// Loads the vocabulary, the intent labels and the model, in that order.
    ///
    /// The first failing step aborts the rest and its error is returned; the
    /// service then stays uninitialized. Calling this on an initialized
    /// service does nothing.
    pub fn initialize(&mut self) -> Result<(), ClassifierError> {
        if self.loaded.is_some() {
            debug!("Classifier already initialized");
            return Ok(());
        }

        info!("Initializing intent classifier...");
        let started = self.clock.now();
        match self.load() {
            Ok(loaded) => {
                info!(
                    "Classifier ready: {} intents, {} tokens, delegate {} (took {:.2?})",
                    loaded.intents.len(),
                    loaded.vocabulary.len(),
                    loaded.delegate.map(|d| d.to_string()).unwrap_or_else(|| "none".into()),
                    self.clock.now().saturating_duration_since(started)
                );
                self.loaded = Some(loaded);
                Ok(())
            }
            Err(e) => {
                error!("Classifier initialization failed: {}", e);
                Err(e)
            }
        }
    }

    fn read_resource(&self, name: &str) -> Result<Vec<u8>, ClassifierError> {
        self.resources
            .read(name)
            .map_err(|e| ClassifierError::resource(name, e))
    }

    fn load(&self) -> Result<LoadedModel, ClassifierError> {
        let vocab_name = &self.config.vocabulary_asset;
        let vocabulary = load_vocabulary(vocab_name, &self.read_resource(vocab_name)?)?;
        info!("Vocabulary loaded: {} tokens", vocabulary.len());

        let intents_name = &self.config.intents_asset;
        let intents = load_intents(intents_name, &self.read_resource(intents_name)?)?;
        info!("Intent labels loaded: {:?}", intents.as_slice());

        let metadata = self.load_metadata(&intents)?;

        let model = self.resources.read(&self.config.model_asset).map_err(|e| {
            ClassifierError::ModelLoad(format!("cannot read '{}': {}", self.config.model_asset, e))
        })?;
        if let Some(expected) = &self.config.model_sha256 {
            if !verify_sha256(&model, expected) {
                return Err(ClassifierError::ModelLoad(format!(
                    "'{}' does not match the expected SHA-256",
                    self.config.model_asset
                )));
            }
        }

        let delegate = if self.use_delegate {
            let platform = platform_of(self.platform.as_deref());
            let delegate = select_delegate(&platform);
            debug!("Platform '{}' selects delegate {:?}", platform, delegate);
            delegate
        } else {
            None
        };
        let (mut engine, delegate) = load_with_fallback(&*self.loader, &model, delegate)?;

        if let Err(e) = self.check_engine(&*engine, &intents) {
            engine.dispose();
            return Err(e);
        }

        Ok(LoadedModel {
            vocabulary,
            intents,
            metadata,
            engine,
            delegate,
        })
    }

    fn load_metadata(&self, intents: &IntentLabels) -> Result<Option<ModelMetadata>, ClassifierError> {
        let Some(name) = &self.config.metadata_asset else {
            return Ok(None);
        };
        if !self.resources.exists(name) {
            debug!("No model metadata at '{}'", name);
            return Ok(None);
        }
        let metadata = ModelMetadata::from_json(name, &self.read_resource(name)?)?;
        metadata.check_labels(name, intents)?;
        metadata.warn_on_sequence_length(self.config.max_sequence_length);
        Ok(Some(metadata))
    }

    /// Rejects models whose output width disagrees with the label count.
    fn check_engine(&self, engine: &dyn InferenceEngine, intents: &IntentLabels) -> Result<(), ClassifierError> {
        if engine.state() != EngineState::Ready {
            return Err(ClassifierError::ModelLoad(format!(
                "loader returned an engine in state {:?}",
                engine.state()
            )));
        }

        let output_shape = engine.output_shape()?;
        match output_shape.last() {
            Some(&classes) if classes != 0 && classes != intents.len() => {
                return Err(ClassifierError::ModelLoad(format!(
                    "model outputs {} classes but {} intent labels were loaded",
                    classes,
                    intents.len()
                )));
            }
            _ => {}
        }

        let input_shape = engine.input_shape()?;
        if input_shape.last() != Some(&self.config.max_sequence_length) {
            warn!(
                "Model input shape {:?} does not end in the configured sequence length {}",
                input_shape, self.config.max_sequence_length
            );
        }
        Ok(())
    }

    /// Classifies `text` into one of the loaded intents.
    ///
    /// Empty or out-of-vocabulary input still produces a result, usually with
    /// low confidence. The reported latency covers tokenization, inference and
    /// postprocessing.
    pub fn classify(&mut self, text: &str) -> Result<ClassificationResult, ClassifierError> {
        let loaded = self.loaded.as_mut().ok_or(ClassifierError::NotInitialized)?;
        let started = self.clock.now();

        let input = encode_text(text, &loaded.vocabulary, self.config.max_sequence_length);
        let logits = loaded.engine.run(input.view())?;
        if logits.len() != loaded.intents.len() {
            return Err(ClassifierError::Inference(format!(
                "model produced {} logits for {} intents",
                logits.len(),
                loaded.intents.len()
            )));
        }

        let probabilities = softmax(&logits);
        let best = argmax(&probabilities)
            .ok_or_else(|| ClassifierError::Inference("model produced no logits".into()))?;
        let intent = loaded
            .intents
            .get(best.index)
            .ok_or_else(|| ClassifierError::Inference(format!("no label for class {}", best.index)))?
            .to_string();

        let elapsed = self.clock.now().saturating_duration_since(started);
        debug!("'{}' -> {} ({:.3}) in {:?}", text, intent, best.value, elapsed);

        Ok(ClassificationResult {
            intent,
            confidence: best.value,
            inference_time_ms: elapsed.as_millis() as u64,
            all_scores: probabilities.to_vec(),
        })
    }

    /// Describes the loaded model.
    pub fn model_info(&self) -> Result<ModelInfo, ClassifierError> {
        let loaded = self.loaded.as_ref().ok_or(ClassifierError::NotInitialized)?;
        let input = loaded.engine.input_spec()?;
        let output = loaded.engine.output_spec()?;

        let mut output_shape = output.shape.clone();
        if let Some(last) = output_shape.last_mut() {
            if *last == 0 {
                *last = loaded.intents.len();
            }
        }

        Ok(ModelInfo {
            input_shape: input.shape.clone(),
            input_type: input.element_type,
            output_shape,
            output_type: output.element_type,
            intent_count: loaded.intents.len(),
            vocabulary_size: loaded.vocabulary.len(),
            max_sequence_length: self.config.max_sequence_length,
            delegate: loaded.delegate,
            model_name: loaded.metadata.as_ref().and_then(|m| m.model_name.clone()),
            model_version: loaded.metadata.as_ref().and_then(|m| m.model_version.clone()),
        })
    }

    /// Classifies the configured phrases `iterations` times, one after the
    /// other, cycling through them, and aggregates the latencies.
    pub fn benchmark(&mut self, iterations: usize) -> Result<BenchmarkResult, ClassifierError> {
        if iterations == 0 {
            return Err(ClassifierError::Validation("iterations must be greater than zero".into()));
        }
        if !self.is_initialized() {
            return Err(ClassifierError::NotInitialized);
        }
        if self.config.benchmark_phrases.is_empty() {
            return Err(ClassifierError::Validation("no benchmark phrases configured".into()));
        }

        info!("Running benchmark with {} iterations", iterations);
        let phrases = self.config.benchmark_phrases.clone();
        let mut latencies = Vec::with_capacity(iterations);
        let mut confidences = Vec::with_capacity(iterations);
        for i in 0..iterations {
            let result = self.classify(&phrases[i % phrases.len()])?;
            latencies.push(result.inference_time_ms);
            confidences.push(result.confidence);
        }

        let result = BenchmarkResult::from_samples(&latencies, &confidences)
            .ok_or_else(|| ClassifierError::Validation("benchmark produced no samples".into()))?;
        info!(
            "Benchmark: median {}ms, mean {:.2}ms, min {}ms, max {}ms, p95 {}ms",
            result.median_ms, result.average_ms, result.min_ms, result.max_ms, result.p95_ms
        );
        Ok(result)
    }

    /// Releases the engine and forgets the loaded resources. Safe to call
    /// repeatedly; the service can be initialized again afterwards.
    pub fn dispose(&mut self) {
        match self.loaded.take() {
            Some(mut loaded) => {
                loaded.engine.dispose();
                info!("Classifier disposed");
            }
            None => debug!("Classifier already disposed"),
        }
    }
}

impl Drop for ClassifierService {
    fn drop(&mut self) {
        self.dispose();
    }
}
