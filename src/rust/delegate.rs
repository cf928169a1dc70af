//! Hardware delegate selection.
//!
//! The platform a classifier runs on decides which ONNX Runtime execution
//! provider is tried first. Attaching a delegate is best effort: any failure
//! is logged and the model is loaded again for plain CPU execution.

use std::fmt;
use log::{info, warn};
use serde::Serialize;

use crate::classifier::engine::{EngineLoader, InferenceEngine};
use crate::classifier::ClassifierError;

/// Platform string used when no provider is available.
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// Supplies a coarse classification of the host platform, e.g. `"android"`,
/// `"ios"` or `"unknown"`.
pub trait PlatformInfoProvider: Send + Sync {
    fn platform(&self) -> String;
}

/// Reports the operating system the crate was compiled for.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostPlatform;

impl PlatformInfoProvider for HostPlatform {
    fn platform(&self) -> String {
        std::env::consts::OS.to_string()
    }
}

/// Reports a fixed platform string, typically handed over by a host application.
#[derive(Debug, Clone)]
pub struct StaticPlatform(pub String);

impl PlatformInfoProvider for StaticPlatform {
    fn platform(&self) -> String {
        self.0.clone()
    }
}

/// Hardware-acceleration backend attached to the inference session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Delegate {
    /// Android Neural Networks API
    Nnapi,
    /// Apple CoreML (GPU / Neural Engine)
    CoreMl,
}

impl fmt::Display for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nnapi => write!(f, "NNAPI"),
            Self::CoreMl => write!(f, "CoreML"),
        }
    }
}

/// Resolves the platform string, defaulting to [`UNKNOWN_PLATFORM`] when no
/// provider is installed.
pub fn platform_of(provider: Option<&dyn PlatformInfoProvider>) -> String {
    provider
        .map(|p| p.platform())
        .unwrap_or_else(|| UNKNOWN_PLATFORM.to_string())
}

/// Maps a platform string to the delegate worth trying on it.
pub fn select_delegate(platform: &str) -> Option<Delegate> {
    match platform.trim().to_ascii_lowercase().as_str() {
        "android" => Some(Delegate::Nnapi),
        "ios" | "macos" | "ipados" | "tvos" | "watchos" => Some(Delegate::CoreMl),
        _ => None,
    }
}

/// Loads a model with `delegate` attached, falling back to the CPU path when
/// the delegate cannot be attached.
///
/// Returns the engine together with the delegate that is actually in use.
/// Only delegate failures are recovered; an invalid model is still an error.
pub fn load_with_fallback(
    loader: &dyn EngineLoader,
    model: &[u8],
    delegate: Option<Delegate>,
) -> Result<(Box<dyn InferenceEngine>, Option<Delegate>), ClassifierError> {
    let Some(delegate) = delegate else {
        return Ok((loader.load(model, None)?, None));
    };

    match loader.load(model, Some(delegate)) {
        Ok(engine) => {
            info!("{} delegate attached", delegate);
            Ok((engine, Some(delegate)))
        }
        Err(err @ ClassifierError::DelegateAttach { .. }) => {
            warn!("{}; continuing on CPU", err);
            Ok((loader.load(model, None)?, None))
        }
        Err(err) => Err(err),
    }
}
