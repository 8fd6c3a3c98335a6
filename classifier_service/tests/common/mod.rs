#![allow(dead_code)]

use classifier_api::codec;
use classifier_service::{
    classifier::{Classifier, ClassifierError},
    config::InferenceConfig,
    inference_service::InferenceService,
    labels::CategoryTable,
    server::{build_router, SharedState},
    telemetry::Metrics,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::{ArrayView4, Axis};
use std::{
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::net::TcpListener;

pub const LABELS: [&str; 6] = ["tench", "goldfish", "beagle", "pug", "tabby", "volcano"];

/// Scores classes by how close their index is to the mean red intensity of the input.
#[derive(Clone, Default)]
pub struct StubClassifier {
    pub calls: Arc<AtomicUsize>,
    pub num_scores: Option<usize>,
    pub delay: Option<Duration>,
}

impl StubClassifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for StubClassifier {
    fn infer(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let red = input.index_axis(Axis(1), 0);
        let mean = red.mean().unwrap_or(0.0);
        let position = (mean + 2.2) / 4.5 * LABELS.len() as f32;
        let num_scores = self.num_scores.unwrap_or(LABELS.len());
        Ok((0..num_scores)
            .map(|i| -(i as f32 - position).abs())
            .collect())
    }
}

pub fn inference_config() -> InferenceConfig {
    InferenceConfig {
        top_k: 3,
        resize_size: 32,
        crop_size: 28,
        ..InferenceConfig::default()
    }
}

pub fn categories() -> CategoryTable {
    CategoryTable::from_labels(LABELS.iter().map(|l| l.to_string()).collect()).unwrap()
}

pub fn shared_state(classifier: StubClassifier) -> SharedState<StubClassifier> {
    SharedState {
        inference_service: InferenceService::new(classifier, categories(), &inference_config()),
        metrics: Arc::new(Metrics::new().unwrap()),
    }
}

pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub async fn spawn_server(state: SharedState<StubClassifier>) -> String {
    spawn_server_with_limit(state, MAX_BODY_BYTES).await
}

pub async fn spawn_server_with_limit(
    state: SharedState<StubClassifier>,
    max_body_bytes: usize,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state, max_body_bytes))
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

pub fn png_payload(red: u8, width: u32, height: u32) -> String {
    let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, Rgb([red, 90, 180]));
    let mut image_data: Vec<u8> = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut image_data), ImageFormat::Png)
        .unwrap();
    codec::encode_payload(&image_data)
}

/// A PNG of pseudo-random pixels, which barely compresses.
pub fn noise_png_payload(side: u32) -> String {
    let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_fn(side, side, |x, y| {
        let v = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(2_246_822_519)).rotate_left(13);
        let [r, g, b, _] = v.wrapping_mul(0x9E37_79B9).to_le_bytes();
        Rgb([r, g, b])
    });
    let mut image_data: Vec<u8> = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut image_data), ImageFormat::Png)
        .unwrap();
    codec::encode_payload(&image_data)
}

/// Sums every sample of a metric, ignoring labels. Counters match with or without `_total`.
pub fn sample_total(exposition: &str, name: &str) -> f64 {
    let counter_name = format!("{name}_total");
    exposition
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let (series, value) = line.rsplit_once(' ')?;
            let metric = series.split('{').next()?;
            if metric != name && metric != counter_name {
                return None;
            }
            value.parse::<f64>().ok()
        })
        .sum()
}
