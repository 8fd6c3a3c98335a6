use crate::{
    classifier::Classifier,
    config::Config,
    inference_service::InferenceService,
    labels::CategoryTable,
    ort_classifier::OrtClassifier,
    server::{HttpServer, SharedState},
    telemetry::Metrics,
};
use std::sync::Arc;

/// Loads the network and labels once and wires them into a ready to serve state.
pub fn initialize<C: Classifier>(
    classifier: C,
    config: &Config,
) -> anyhow::Result<SharedState<C>> {
    let categories = CategoryTable::new(&config.labels)?;
    let inference_service = InferenceService::new(classifier, categories, &config.inference);
    let metrics = Arc::new(Metrics::new()?);

    Ok(SharedState {
        inference_service,
        metrics,
    })
}

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let classifier = match OrtClassifier::new(&config.model) {
        Ok(classifier) => classifier,
        Err(e) => {
            tracing::error!("Failed to load model {:?}: {}", config.model.get_path(), e);
            return Err(e.into());
        }
    };
    let state = initialize(classifier, &config)?;

    let server = HttpServer::new(state, &config.server).await?;
    server.run().await
}
