#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ndarray::{Array1, ArrayView2};
use ondevice_intent::{
    ClassifierError, ClassifierService, ClassifierServiceBuilder, Clock, Delegate, ElementType,
    EngineLoader, EngineState, InferenceEngine, MemoryAssets, TensorSpec, MAX_SEQUENCE_LENGTH,
};

pub const VOCAB: &str = "<pad>\nhello\nworld\nweather\ntime\nwhat\ns\nthe\nis\nit\nrain\n";
pub const LABELS: &str = "greeting\nweather\ntime\n";
pub const MODEL: &[u8] = b"mock-model";
pub const CORRUPT_MODEL: &[u8] = b"corrupt";

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
        })
    }

    pub fn advance(&self, ms: u64) {
        self.offset_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// Scores each class by how often its keyword ID appears in the input:
/// hello (1) -> greeting, weather (3) / rain (10) -> weather, time (4) -> time.
pub struct KeywordEngine {
    input: TensorSpec,
    output: TensorSpec,
    state: EngineState,
    clock: Option<Arc<ManualClock>>,
    latencies: Vec<u64>,
    runs: Arc<AtomicUsize>,
    first_ids: Arc<Mutex<Vec<i64>>>,
    delay: Option<Duration>,
}

impl KeywordEngine {
    fn check_ready(&self) -> Result<(), ClassifierError> {
        if self.state == EngineState::Ready {
            Ok(())
        } else {
            Err(ClassifierError::NotInitialized)
        }
    }
}

impl InferenceEngine for KeywordEngine {
    fn state(&self) -> EngineState {
        self.state
    }

    fn input_spec(&self) -> Result<&TensorSpec, ClassifierError> {
        self.check_ready()?;
        Ok(&self.input)
    }

    fn output_spec(&self) -> Result<&TensorSpec, ClassifierError> {
        self.check_ready()?;
        Ok(&self.output)
    }

    fn run(&mut self, input: ArrayView2<'_, i64>) -> Result<Array1<f32>, ClassifierError> {
        self.check_ready()?;
        self.input.check_shape(input.shape())?;

        let run = self.runs.fetch_add(1, Ordering::SeqCst);
        self.first_ids.lock().unwrap().push(input[[0, 0]]);
        if let Some(clock) = &self.clock {
            if !self.latencies.is_empty() {
                clock.advance(self.latencies[run % self.latencies.len()]);
            }
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let classes = self.output.shape[1];
        let mut logits = Array1::<f32>::zeros(classes);
        for &id in input.iter() {
            let class = match id {
                1 => Some(0),
                3 | 10 => Some(1),
                4 => Some(2),
                _ => None,
            };
            if let Some(class) = class.filter(|&c| c < classes) {
                logits[class] += 2.0;
            }
        }
        Ok(logits)
    }

    fn dispose(&mut self) {
        self.state = EngineState::Disposed;
    }
}

/// Loader producing [`KeywordEngine`]s and recording every request.
#[derive(Clone)]
pub struct MockLoader {
    pub requests: Arc<Mutex<Vec<Option<Delegate>>>>,
    pub runs: Arc<AtomicUsize>,
    pub first_ids: Arc<Mutex<Vec<i64>>>,
    pub reject_delegates: bool,
    pub delegate_failure: &'static str,
    pub engine_state: EngineState,
    pub classes: usize,
    pub input_len: usize,
    pub clock: Option<Arc<ManualClock>>,
    pub latencies: Vec<u64>,
    pub delay: Option<Duration>,
}

impl Default for MockLoader {
    fn default() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            runs: Arc::new(AtomicUsize::new(0)),
            first_ids: Arc::new(Mutex::new(Vec::new())),
            reject_delegates: false,
            delegate_failure: "driver not present",
            engine_state: EngineState::Ready,
            classes: 3,
            input_len: MAX_SEQUENCE_LENGTH,
            clock: None,
            latencies: Vec::new(),
            delay: None,
        }
    }
}

impl MockLoader {
    pub fn requests(&self) -> Vec<Option<Delegate>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// First token ID of every batch the engines have run, in order.
    pub fn first_ids(&self) -> Vec<i64> {
        self.first_ids.lock().unwrap().clone()
    }
}

impl EngineLoader for MockLoader {
    fn load(
        &self,
        model: &[u8],
        delegate: Option<Delegate>,
    ) -> Result<Box<dyn InferenceEngine>, ClassifierError> {
        self.requests.lock().unwrap().push(delegate);

        if let (Some(delegate), true) = (delegate, self.reject_delegates) {
            return Err(ClassifierError::DelegateAttach {
                delegate: delegate.to_string(),
                reason: self.delegate_failure.into(),
            });
        }
        if model != MODEL {
            return Err(ClassifierError::ModelLoad("not a valid graph".into()));
        }

        Ok(Box::new(KeywordEngine {
            input: TensorSpec::new("input_ids", vec![1, self.input_len], ElementType::Int32),
            output: TensorSpec::new("logits", vec![1, self.classes], ElementType::Float32),
            state: self.engine_state,
            clock: self.clock.clone(),
            latencies: self.latencies.clone(),
            runs: Arc::clone(&self.runs),
            first_ids: Arc::clone(&self.first_ids),
            delay: self.delay,
        }))
    }
}

pub fn assets() -> MemoryAssets {
    MemoryAssets::new()
        .with("vocab.txt", VOCAB)
        .with("labels.txt", LABELS)
        .with("model.onnx", MODEL)
}

pub fn builder(loader: &MockLoader) -> ClassifierServiceBuilder {
    ClassifierService::builder()
        .with_resources(assets())
        .with_engine_loader(loader.clone())
}

pub fn ready_service(loader: &MockLoader) -> ClassifierService {
    let mut service = builder(loader).build().expect("Failed to build service");
    service.initialize().expect("Failed to initialize service");
    service
}
