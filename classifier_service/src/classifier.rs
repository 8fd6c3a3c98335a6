use ndarray::ArrayView4;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("backend failure: {0}")]
    Backend(String),
    #[error("session mutex poisoned: {0}")]
    SessionPoisoned(String),
    #[error("unexpected model output: {0}")]
    UnexpectedOutput(String),
}

/// A pretrained network mapping a `1x3xHxW` tensor to one score per class.
///
/// Implementations are loaded once and shared read-only across requests, so `infer`
/// must be deterministic for a given input.
pub trait Classifier: Send + Sync + 'static {
    fn infer(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassifierError>;
}
