use anyhow::{bail, Context};
use classifier_api::{codec, round_to_millis, ErrorResponse, InferRequest, InferResponse};
use image::{imageops::FilterType, ImageFormat};
use std::{io::Cursor, path::Path, time::Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_URL: &str = "http://localhost:9999";
const UPLOAD_SIZE: u32 = 256;

/// Shrinks the image before upload and re-encodes it as JPEG.
fn encode_image(path: &Path) -> anyhow::Result<String> {
    let original_img =
        image::open(path).with_context(|| format!("failed to load image from {:?}", path))?;
    let img = original_img
        .resize_exact(UPLOAD_SIZE, UPLOAD_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)?;

    Ok(codec::encode_payload(&buffer))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: classifier_client <image> [server url]");
    };
    let base_url = args
        .next()
        .or_else(|| std::env::var("CLASSIFIER_URL").ok())
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    let request = InferRequest {
        data: encode_image(Path::new(&path))?,
    };

    let started = Instant::now();
    let response = reqwest::Client::new()
        .post(format!("{}/infer", base_url.trim_end_matches('/')))
        .json(&request)
        .send()
        .await
        .with_context(|| format!("failed to reach {}", base_url))?;
    let status = response.status();
    let total_time = round_to_millis(started.elapsed());

    if !status.is_success() {
        let error: ErrorResponse = response.json().await?;
        tracing::error!(?status, kind = ?error.error, "{}", error.message);
        bail!("inference failed with status {}", status);
    }

    let prediction: InferResponse = response.json().await?;
    println!("Response: {:?}", prediction);
    println!("Server-side processing time: {} seconds", prediction.processing_time);
    println!("Total request time: {} seconds", total_time);

    Ok(())
}
