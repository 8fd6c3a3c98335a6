use crate::{
    classifier::Classifier,
    inference_service::{InferenceError, PredictionResult},
    server::SharedState,
    telemetry::Metrics,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use classifier_api::{round_to_millis, ErrorKind, ErrorResponse, InferRequest, InferResponse};
use tracing::instrument;

const INTERNAL_ERROR_MESSAGE: &str = "internal inference error";

impl From<JsonRejection> for InferenceError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            InferenceError::PayloadTooLarge(rejection.body_text())
        } else {
            InferenceError::InputDecode(rejection.body_text())
        }
    }
}

impl IntoResponse for InferenceError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            InferenceError::InputDecode(message) => {
                (StatusCode::BAD_REQUEST, ErrorKind::InvalidInput, message)
            }
            InferenceError::PayloadTooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorKind::PayloadTooLarge,
                message,
            ),
            InferenceError::Preprocess(message) => {
                (StatusCode::BAD_REQUEST, ErrorKind::PreprocessFailed, message)
            }
            InferenceError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::InternalError,
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        };
        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

impl From<PredictionResult> for InferResponse {
    fn from(result: PredictionResult) -> Self {
        InferResponse {
            predictions: result.predictions,
            processing_time: round_to_millis(result.processing_time),
        }
    }
}

#[instrument(skip(state, body))]
pub async fn infer<C: Classifier>(
    State(state): State<SharedState<C>>,
    body: Result<Json<InferRequest>, JsonRejection>,
) -> Result<Json<InferResponse>, InferenceError> {
    state.metrics.record_request();

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = InferenceError::from(rejection);
            record_outcome(&state.metrics, Err(&err));
            return Err(err);
        }
    };

    // Outcomes are recorded in the blocking task, which outlives a dropped request future.
    let inference_service = state.inference_service.clone();
    let metrics = state.metrics.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let result = inference_service.predict(&request.data);
        record_outcome(&metrics, result.as_ref());
        result
    })
    .await;

    match joined {
        Ok(result) => result.map(|prediction| Json(prediction.into())),
        Err(e) => {
            let err = InferenceError::Internal(format!("inference task failed: {}", e));
            record_outcome(&state.metrics, Err(&err));
            Err(err)
        }
    }
}

fn record_outcome(metrics: &Metrics, result: Result<&PredictionResult, &InferenceError>) {
    match result {
        Ok(prediction) => {
            let seconds = prediction.processing_time.as_secs_f64();
            metrics.record_latency(seconds);
            tracing::info!("Server-side processing took {:.3}s", seconds);
        }
        Err(err) => {
            metrics.record_exception(err.kind());
            match err {
                InferenceError::Internal(detail) => tracing::error!("Inference failed: {}", detail),
                other => tracing::warn!("Rejected inference request: {}", other),
            }
        }
    }
}
