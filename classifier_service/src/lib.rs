mod routes;

pub mod app;
pub mod classifier;
pub mod config;
pub mod inference_service;
pub mod labels;
pub mod ort_classifier;
pub mod preprocess;
pub mod ranker;
pub mod server;
pub mod telemetry;

pub use app::start_app;
