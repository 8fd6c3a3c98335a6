mod health;
mod infer;
mod metrics;

use crate::{classifier::Classifier, server::SharedState};
use axum::{
    routing::{get, post},
    Router,
};

pub fn api_routes<C: Classifier>() -> Router<SharedState<C>> {
    Router::new()
        .route("/infer", post(infer::infer::<C>))
        .route("/metrics", get(metrics::metrics_handler::<C>))
        .route("/health", get(health::healthcheck))
}
