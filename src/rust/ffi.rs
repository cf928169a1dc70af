//! C ABI for host applications.
//!
//! Results cross the boundary as NUL-terminated JSON strings owned by this
//! library; release them with [`intent_string_free`]. Failures are reported
//! as `{"error": <code>, "message": <text for the user>, "detail": <text>}`.

use std::ffi::{c_char, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use serde::Serialize;

use crate::assets::AssetDir;
use crate::classifier::{ClassifierError, ClassifierService};
use crate::delegate::StaticPlatform;

/// Opaque classifier handle.
pub struct IntentClassifier {
    service: ClassifierService,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error: i32,
    message: &'a str,
    detail: String,
}

fn error_json(err: &ClassifierError) -> String {
    let payload = ErrorPayload {
        error: err.code(),
        message: err.user_message(),
        detail: err.to_string(),
    };
    serde_json::to_string(&payload)
        .unwrap_or_else(|_| format!("{{\"error\":{}}}", err.code()))
}

fn into_c_json<T: Serialize>(result: Result<T, ClassifierError>) -> *mut c_char {
    let json = match result {
        Ok(value) => serde_json::to_string(&value)
            .unwrap_or_else(|e| error_json(&ClassifierError::Inference(e.to_string()))),
        Err(err) => {
            if err.is_per_call() {
                log::warn!("Classification failed: {}", err);
            }
            error_json(&err)
        }
    };
    CString::new(json).map(CString::into_raw).unwrap_or(ptr::null_mut())
}

/// Runs `f`, turning a panic into `on_panic()` so it never unwinds into the
/// host.
fn guarded<T>(on_panic: impl FnOnce() -> T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        log::error!("Panic caught at the C boundary");
        on_panic()
    })
}

fn panic_json() -> *mut c_char {
    into_c_json::<()>(Err(ClassifierError::Inference("internal panic".into())))
}

/// Reads an optional UTF-8 C string. Null and invalid UTF-8 both yield `None`.
unsafe fn optional_str<'a>(value: *const c_char) -> Option<&'a str> {
    if value.is_null() {
        return None;
    }
    CStr::from_ptr(value).to_str().ok()
}

/// Creates an uninitialized classifier reading assets from `assets_dir`.
///
/// `assets_dir` may be null to use the default asset directory. `platform`
/// may be null when the host cannot tell; inference then runs on CPU.
/// Returns null when the configuration is invalid.
///
/// # Safety
/// Non-null arguments must point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn intent_classifier_new(
    assets_dir: *const c_char,
    platform: *const c_char,
) -> *mut IntentClassifier {
    let assets_dir = optional_str(assets_dir);
    let platform = optional_str(platform);
    guarded(ptr::null_mut, || {
        let resources = match assets_dir {
            Some(dir) => AssetDir::new(dir),
            None => AssetDir::new_default(),
        };
        let mut builder = ClassifierService::builder().with_resources(resources);
        if let Some(platform) = platform {
            builder = builder.with_platform(StaticPlatform(platform.to_string()));
        }

        match builder.build() {
            Ok(service) => Box::into_raw(Box::new(IntentClassifier { service })),
            Err(e) => {
                log::error!("Failed to create classifier: {}", e);
                ptr::null_mut()
            }
        }
    })
}

/// Loads the vocabulary, labels and model. Returns 0 on success or an error
/// code.
///
/// # Safety
/// `handle` must come from [`intent_classifier_new`] and not be freed.
#[no_mangle]
pub unsafe extern "C" fn intent_classifier_initialize(handle: *mut IntentClassifier) -> i32 {
    let Some(classifier) = handle.as_mut() else {
        return ClassifierError::NotInitialized.code();
    };
    guarded(
        || ClassifierError::Inference(String::new()).code(),
        || match classifier.service.initialize() {
            Ok(()) => 0,
            Err(e) => e.code(),
        },
    )
}

/// Classifies `text`, returning a JSON classification result or error.
///
/// # Safety
/// `handle` must come from [`intent_classifier_new`]; `text` must be null or
/// a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn intent_classifier_classify(
    handle: *mut IntentClassifier,
    text: *const c_char,
) -> *mut c_char {
    let Some(classifier) = handle.as_mut() else {
        return into_c_json::<()>(Err(ClassifierError::NotInitialized));
    };
    let text = optional_str(text).unwrap_or("");
    guarded(panic_json, || into_c_json(classifier.service.classify(text)))
}

/// Returns the model description as JSON.
///
/// # Safety
/// `handle` must come from [`intent_classifier_new`].
#[no_mangle]
pub unsafe extern "C" fn intent_classifier_model_info(handle: *const IntentClassifier) -> *mut c_char {
    match handle.as_ref() {
        Some(classifier) => guarded(panic_json, || into_c_json(classifier.service.model_info())),
        None => into_c_json::<()>(Err(ClassifierError::NotInitialized)),
    }
}

/// Runs a benchmark and returns its statistics as JSON.
///
/// # Safety
/// `handle` must come from [`intent_classifier_new`].
#[no_mangle]
pub unsafe extern "C" fn intent_classifier_benchmark(
    handle: *mut IntentClassifier,
    iterations: u32,
) -> *mut c_char {
    match handle.as_mut() {
        Some(classifier) => guarded(panic_json, || {
            into_c_json(classifier.service.benchmark(iterations as usize))
        }),
        None => into_c_json::<()>(Err(ClassifierError::NotInitialized)),
    }
}

/// Releases the model; the handle stays valid and can be initialized again.
///
/// # Safety
/// `handle` must come from [`intent_classifier_new`] or be null.
#[no_mangle]
pub unsafe extern "C" fn intent_classifier_dispose(handle: *mut IntentClassifier) {
    if let Some(classifier) = handle.as_mut() {
        guarded(|| (), || classifier.service.dispose());
    }
}

/// Destroys a handle created by [`intent_classifier_new`].
///
/// # Safety
/// `handle` must be null or a live handle; it must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn intent_classifier_free(handle: *mut IntentClassifier) {
    if !handle.is_null() {
        let classifier = Box::from_raw(handle);
        guarded(|| (), move || drop(classifier));
    }
}

/// Frees a string returned by this library.
///
/// # Safety
/// `value` must be null or a pointer returned by one of the functions above.
#[no_mangle]
pub unsafe extern "C" fn intent_string_free(value: *mut c_char) {
    if !value.is_null() {
        drop(CString::from_raw(value));
    }
}
