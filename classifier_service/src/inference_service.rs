use crate::{
    classifier::{Classifier, ClassifierError},
    config::InferenceConfig,
    labels::CategoryTable,
    preprocess::{PreprocessError, Preprocessor},
    ranker::{self, RankError},
    telemetry::ExceptionKind,
};
use classifier_api::codec::{self, CodecError};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Invalid input: {0}")]
    InputDecode(String),
    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),
    #[error("Preprocessing failed: {0}")]
    Preprocess(String),
    #[error("Inference failed: {0}")]
    Internal(String),
}

impl InferenceError {
    pub fn kind(&self) -> ExceptionKind {
        match self {
            InferenceError::InputDecode(_)
            | InferenceError::PayloadTooLarge(_)
            | InferenceError::Preprocess(_) => ExceptionKind::Client,
            InferenceError::Internal(_) => ExceptionKind::Server,
        }
    }
}

impl From<CodecError> for InferenceError {
    fn from(err: CodecError) -> Self {
        InferenceError::InputDecode(err.to_string())
    }
}

impl From<PreprocessError> for InferenceError {
    fn from(err: PreprocessError) -> Self {
        match err {
            PreprocessError::Decode(_) => InferenceError::InputDecode(err.to_string()),
            PreprocessError::Shape { .. } => InferenceError::Preprocess(err.to_string()),
        }
    }
}

impl From<ClassifierError> for InferenceError {
    fn from(err: ClassifierError) -> Self {
        InferenceError::Internal(err.to_string())
    }
}

impl From<RankError> for InferenceError {
    fn from(err: RankError) -> Self {
        InferenceError::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub predictions: Vec<String>,
    pub processing_time: Duration,
}

/// Decode, preprocess, classify and rank one image.
///
/// Cloning is cheap: the classifier and category table are shared, never copied.
pub struct InferenceService<C: Classifier> {
    classifier: Arc<C>,
    categories: Arc<CategoryTable>,
    preprocessor: Preprocessor,
    top_k: usize,
}

impl<C: Classifier> Clone for InferenceService<C> {
    fn clone(&self) -> Self {
        Self {
            classifier: self.classifier.clone(),
            categories: self.categories.clone(),
            preprocessor: self.preprocessor.clone(),
            top_k: self.top_k,
        }
    }
}

impl<C: Classifier> InferenceService<C> {
    pub fn new(classifier: C, categories: CategoryTable, config: &InferenceConfig) -> Self {
        Self {
            classifier: Arc::new(classifier),
            categories: Arc::new(categories),
            preprocessor: Preprocessor::new(config),
            top_k: config.top_k,
        }
    }

    /// Runs the whole pipeline on a base64 payload. The measured time starts before the
    /// payload is decoded and stops once the ranked labels are available.
    pub fn predict(&self, payload: &str) -> Result<PredictionResult, InferenceError> {
        let started = Instant::now();

        let image_data = codec::decode_payload(payload)?;
        let input = self.preprocessor.process(&image_data)?;
        let scores = self.classifier.infer(input.view())?;
        let predictions = ranker::rank(&scores, &self.categories, self.top_k)?;

        Ok(PredictionResult {
            predictions,
            processing_time: started.elapsed(),
        })
    }
}
