use std::collections::HashMap;
use std::fmt;
use log::{debug, error, info};
use ndarray::{Array1, ArrayView2};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};
use serde::Serialize;

use super::error::ClassifierError;
use super::tokenizer::MAX_SEQUENCE_LENGTH;
use crate::delegate::Delegate;
use crate::runtime::{attach_delegate, create_session_builder, RuntimeConfig};

/// Element type of a model input or output tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementType {
    Int8,
    UInt8,
    Int32,
    Int64,
    Float32,
    Other,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

impl From<TensorElementType> for ElementType {
    fn from(ty: TensorElementType) -> Self {
        match ty {
            TensorElementType::Int8 => Self::Int8,
            TensorElementType::Uint8 => Self::UInt8,
            TensorElementType::Int32 => Self::Int32,
            TensorElementType::Int64 => Self::Int64,
            TensorElementType::Float32 => Self::Float32,
            _ => Self::Other,
        }
    }
}

/// Name, shape and element type of one model tensor.
///
/// A zero in `shape` marks a dimension the graph leaves open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub element_type: ElementType,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            shape,
            element_type,
        }
    }

    /// Fails with `ShapeMismatch` unless `actual` equals this tensor's shape.
    pub fn check_shape(&self, actual: &[usize]) -> Result<(), ClassifierError> {
        if self.shape.as_slice() == actual {
            Ok(())
        } else {
            Err(ClassifierError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: actual.to_vec(),
            })
        }
    }
}

/// Lifecycle of an inference engine: `Unloaded -> Loading -> Ready ->
/// Disposed`. `run` only succeeds in `Ready`, a failed load returns to
/// `Unloaded`, and there is no way back from `Disposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
    Disposed,
}

/// A loaded model graph able to run single forward passes.
///
/// Implementations are not expected to be reentrant; `run` takes `&mut self`
/// so callers serialize access.
pub trait InferenceEngine: Send {
    fn state(&self) -> EngineState;

    fn input_spec(&self) -> Result<&TensorSpec, ClassifierError>;

    fn output_spec(&self) -> Result<&TensorSpec, ClassifierError>;

    /// Runs the model on a `[1, seq_len]` batch and returns the logits of the
    /// single output row.
    fn run(&mut self, input: ArrayView2<'_, i64>) -> Result<Array1<f32>, ClassifierError>;

    /// Releases the graph. Later calls fail with `NotInitialized`.
    fn dispose(&mut self);

    fn input_shape(&self) -> Result<Vec<usize>, ClassifierError> {
        self.input_spec().map(|spec| spec.shape.clone())
    }

    fn output_shape(&self) -> Result<Vec<usize>, ClassifierError> {
        self.output_spec().map(|spec| spec.shape.clone())
    }
}

/// Turns model bytes into an engine, optionally with a hardware delegate.
///
/// Implementations report a delegate that cannot be attached as
/// `DelegateAttach` so callers can retry without it.
pub trait EngineLoader: Send + Sync {
    fn load(
        &self,
        model: &[u8],
        delegate: Option<Delegate>,
    ) -> Result<Box<dyn InferenceEngine>, ClassifierError>;
}

/// ONNX Runtime backed engine.
pub struct OrtEngine {
    runtime_config: RuntimeConfig,
    max_sequence_length: usize,
    session: Option<Session>,
    input: TensorSpec,
    output: TensorSpec,
    state: EngineState,
}

impl OrtEngine {
    /// Creates an `Unloaded` engine; [`load`](Self::load) makes it `Ready`.
    pub fn new(runtime_config: RuntimeConfig, max_sequence_length: usize) -> Self {
        Self {
            runtime_config,
            max_sequence_length,
            session: None,
            input: TensorSpec::new("", Vec::new(), ElementType::Other),
            output: TensorSpec::new("", Vec::new(), ElementType::Other),
            state: EngineState::Unloaded,
        }
    }

    /// Builds the session for `model`, attaching `delegate` when given.
    ///
    /// Only an `Unloaded` engine can load. On failure the engine goes back to
    /// `Unloaded`. Any delegate failure, including graph partitioning at
    /// commit time, is reported as `DelegateAttach`.
    pub fn load(&mut self, model: &[u8], delegate: Option<Delegate>) -> Result<(), ClassifierError> {
        if self.state != EngineState::Unloaded {
            return Err(ClassifierError::ModelLoad(format!(
                "cannot load a model into an engine in state {:?}",
                self.state
            )));
        }

        self.state = EngineState::Loading;
        match self.commit(model, delegate) {
            Ok((session, input, output)) => {
                info!(
                    "Model ready: input '{}' {:?} ({}), output '{}' {:?} ({})",
                    input.name, input.shape, input.element_type, output.name, output.shape, output.element_type
                );
                self.session = Some(session);
                self.input = input;
                self.output = output;
                self.state = EngineState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::Unloaded;
                Err(e)
            }
        }
    }

    fn commit(
        &self,
        model: &[u8],
        delegate: Option<Delegate>,
    ) -> Result<(Session, TensorSpec, TensorSpec), ClassifierError> {
        let mut builder = create_session_builder(&self.runtime_config)?;

        if let Some(delegate) = delegate {
            builder = attach_delegate(builder, delegate).map_err(|e| ClassifierError::DelegateAttach {
                delegate: delegate.to_string(),
                reason: e.to_string(),
            })?;
        }

        // Delegates partition the graph at commit time, so unsupported ops
        // only show up here
        let session = builder.commit_from_memory(model).map_err(|e| match delegate {
            Some(delegate) => ClassifierError::DelegateAttach {
                delegate: delegate.to_string(),
                reason: e.to_string(),
            },
            None => {
                error!("Failed to load model ({} bytes): {}", model.len(), e);
                ClassifierError::ModelLoad(e.to_string())
            }
        })?;

        let (input, output) = Self::validate_model(&session, self.max_sequence_length)?;
        Ok((session, input, output))
    }

    /// Validates that the model has one integer-like input and one float output
    fn validate_model(
        session: &Session,
        max_sequence_length: usize,
    ) -> Result<(TensorSpec, TensorSpec), ClassifierError> {
        let input = session.inputs.first().ok_or_else(|| {
            ClassifierError::ModelLoad("Model must have at least 1 input".to_string())
        })?;
        let output = session.outputs.first().ok_or_else(|| {
            ClassifierError::ModelLoad("Model must have at least 1 output for logits".to_string())
        })?;

        let input = tensor_spec(&input.name, &input.input_type, |axis| {
            if axis == 0 { 1 } else { max_sequence_length }
        })?;
        let output = tensor_spec(&output.name, &output.output_type, |axis| {
            if axis == 0 { 1 } else { 0 }
        })?;

        if !matches!(
            input.element_type,
            ElementType::Int32 | ElementType::Int64 | ElementType::Float32
        ) {
            return Err(ClassifierError::ModelLoad(format!(
                "Unsupported input element type {}",
                input.element_type
            )));
        }
        if output.element_type != ElementType::Float32 {
            return Err(ClassifierError::ModelLoad(format!(
                "Output must be float32, found {}",
                output.element_type
            )));
        }
        Ok((input, output))
    }

    fn ready_session(&self) -> Result<&Session, ClassifierError> {
        match (&self.session, self.state) {
            (Some(session), EngineState::Ready) => Ok(session),
            _ => Err(ClassifierError::NotInitialized),
        }
    }

    fn input_value(&self, input: ArrayView2<'_, i64>) -> Result<DynValue, ClassifierError> {
        let fail = |e: ort::Error| {
            ClassifierError::Inference(format!("Failed to create input tensor: {}", e))
        };
        let input = input.into_dyn();
        let value = match self.input.element_type {
            ElementType::Int32 => {
                let cast = input.mapv(|id| id as i32);
                Tensor::from_array(&cast.as_standard_layout()).map_err(fail)?.into_dyn()
            }
            ElementType::Float32 => {
                let cast = input.mapv(|id| id as f32);
                Tensor::from_array(&cast.as_standard_layout()).map_err(fail)?.into_dyn()
            }
            _ => Tensor::from_array(&input.as_standard_layout()).map_err(fail)?.into_dyn(),
        };
        Ok(value)
    }
}

/// Reads a tensor's declared type, resolving open dimensions with `resolve`.
fn tensor_spec(
    name: &str,
    value_type: &ValueType,
    resolve: impl Fn(usize) -> usize,
) -> Result<TensorSpec, ClassifierError> {
    match value_type {
        ValueType::Tensor { ty, dimensions, .. } => {
            let shape = dimensions
                .iter()
                .enumerate()
                .map(|(axis, &dim)| if dim > 0 { dim as usize } else { resolve(axis) })
                .collect();
            Ok(TensorSpec::new(name, shape, ElementType::from(*ty)))
        }
        other => Err(ClassifierError::ModelLoad(format!(
            "Tensor '{}' is not a tensor: {:?}",
            name, other
        ))),
    }
}

impl InferenceEngine for OrtEngine {
    fn state(&self) -> EngineState {
        self.state
    }

    fn input_spec(&self) -> Result<&TensorSpec, ClassifierError> {
        self.ready_session()?;
        Ok(&self.input)
    }

    fn output_spec(&self) -> Result<&TensorSpec, ClassifierError> {
        self.ready_session()?;
        Ok(&self.output)
    }

    fn run(&mut self, input: ArrayView2<'_, i64>) -> Result<Array1<f32>, ClassifierError> {
        let session = self.ready_session()?;
        self.input.check_shape(input.shape())?;

        let mut input_tensors = HashMap::new();
        input_tensors.insert(self.input.name.as_str(), self.input_value(input)?);

        let outputs = session
            .run(input_tensors)
            .map_err(|e| ClassifierError::Inference(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        Ok(Array1::from_iter(output_tensor.iter().copied()))
    }

    fn dispose(&mut self) {
        if self.session.take().is_some() {
            debug!("ONNX session released");
        }
        self.state = EngineState::Disposed;
    }
}

/// Loads ONNX models with the configured runtime settings.
#[derive(Debug, Clone)]
pub struct OrtEngineLoader {
    runtime_config: RuntimeConfig,
    max_sequence_length: usize,
}

impl Default for OrtEngineLoader {
    fn default() -> Self {
        Self::new(RuntimeConfig::default(), MAX_SEQUENCE_LENGTH)
    }
}

impl OrtEngineLoader {
    pub fn new(runtime_config: RuntimeConfig, max_sequence_length: usize) -> Self {
        Self {
            runtime_config,
            max_sequence_length,
        }
    }
}

impl EngineLoader for OrtEngineLoader {
    fn load(
        &self,
        model: &[u8],
        delegate: Option<Delegate>,
    ) -> Result<Box<dyn InferenceEngine>, ClassifierError> {
        let mut engine = OrtEngine::new(self.runtime_config.clone(), self.max_sequence_length);
        engine.load(model, delegate)?;
        Ok(Box::new(engine))
    }
}
