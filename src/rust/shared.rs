use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::classifier::{BenchmarkResult, ClassificationResult, ClassifierError, ClassifierService, ModelInfo};

/// Cloneable handle serializing access to one [`ClassifierService`] from
/// async code.
///
/// Calls run on Tokio's blocking pool so a slow forward pass never stalls the
/// executor. Only one call holds the service at a time.
#[derive(Clone)]
pub struct SharedClassifier {
    inner: Arc<Mutex<ClassifierService>>,
}

impl SharedClassifier {
    pub fn new(service: ClassifierService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    async fn with_service<T, F>(&self, f: F) -> Result<T, ClassifierError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ClassifierService) -> Result<T, ClassifierError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut service = inner.blocking_lock();
            f(&mut service)
        })
        .await
        .map_err(|e| ClassifierError::Inference(format!("classifier task failed: {}", e)))?
    }

    pub async fn initialize(&self) -> Result<(), ClassifierError> {
        self.with_service(|service| service.initialize()).await
    }

    pub async fn classify(&self, text: impl Into<String>) -> Result<ClassificationResult, ClassifierError> {
        let text = text.into();
        self.with_service(move |service| service.classify(&text)).await
    }

    /// Classifies `text`, giving up after `deadline`.
    ///
    /// On expiry the pending call is not aborted; it finishes in the
    /// background and its result is dropped.
    pub async fn classify_within(
        &self,
        text: impl Into<String>,
        deadline: Duration,
    ) -> Result<ClassificationResult, ClassifierError> {
        match tokio::time::timeout(deadline, self.classify(text)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Classification exceeded {:?}, dropping result", deadline);
                Err(ClassifierError::DeadlineExceeded(deadline))
            }
        }
    }

    pub async fn model_info(&self) -> Result<ModelInfo, ClassifierError> {
        self.inner.lock().await.model_info()
    }

    /// Labels in logit order.
    pub async fn intent_labels(&self) -> Result<Vec<String>, ClassifierError> {
        let service = self.inner.lock().await;
        service
            .intent_labels()
            .map(|labels| labels.as_slice().to_vec())
            .ok_or(ClassifierError::NotInitialized)
    }

    pub async fn benchmark(&self, iterations: usize) -> Result<BenchmarkResult, ClassifierError> {
        self.with_service(move |service| service.benchmark(iterations)).await
    }

    pub async fn dispose(&self) {
        self.inner.lock().await.dispose();
    }
}
