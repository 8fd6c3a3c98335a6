use crate::config::InferenceConfig;
use image::{imageops::FilterType, DynamicImage, GenericImageView, Limits};
use ndarray::{Array, Ix4};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Error decoding image: {0}")]
    Decode(String),
    #[error("Cannot bring a {width}x{height} image to {target}x{target}")]
    Shape { width: u32, height: u32, target: u32 },
}

/// Turns encoded image bytes into the normalized `1x3xHxW` tensor the network was trained on.
///
/// The shorter side is resized to `resize_size` keeping the aspect ratio, then a centered
/// `crop_size` square is cut out, scaled to `[0, 1]` and normalized per RGB channel.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    resize_size: u32,
    crop_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
    max_image_side: u32,
    max_decode_bytes: u64,
}

impl Preprocessor {
    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            resize_size: config.resize_size,
            crop_size: config.crop_size,
            mean: config.mean,
            std: config.std,
            max_image_side: config.max_image_side,
            max_decode_bytes: config.max_decode_bytes,
        }
    }

    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.crop_size as usize;
        [1, 3, side, side]
    }

    pub fn process(&self, image_data: &[u8]) -> Result<Array<f32, Ix4>, PreprocessError> {
        let image = self.decode_image(image_data)?;
        self.transform(&image)
    }

    pub fn transform(&self, image: &DynamicImage) -> Result<Array<f32, Ix4>, PreprocessError> {
        let (width, height) = image.dimensions();
        let shape_error = PreprocessError::Shape {
            width,
            height,
            target: self.crop_size,
        };
        if width == 0 || height == 0 {
            return Err(shape_error);
        }

        let (resized_width, resized_height) = resize_dimensions(width, height, self.resize_size);
        if resized_width < self.crop_size || resized_height < self.crop_size {
            return Err(shape_error);
        }

        // Crop the source window that maps onto the centered crop, so the only
        // allocation is the `crop_size` square.
        let (left, crop_width) = source_window(width, resized_width, self.crop_size);
        let (top, crop_height) = source_window(height, resized_height, self.crop_size);
        let img = image
            .crop_imm(left, top, crop_width, crop_height)
            .resize_exact(self.crop_size, self.crop_size, FilterType::Triangle)
            .to_rgb8();
        if img.dimensions() != (self.crop_size, self.crop_size) {
            return Err(shape_error);
        }

        let mut input = Array::zeros(self.input_shape());
        for (x, y, pixel) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for (channel, value) in pixel.0.iter().enumerate() {
                let scaled = (*value as f32) / 255.;
                input[[0, channel, y, x]] = (scaled - self.mean[channel]) / self.std[channel];
            }
        }

        Ok(input)
    }

    fn decode_image(&self, image_data: &[u8]) -> Result<DynamicImage, PreprocessError> {
        if image_data.is_empty() {
            return Err(PreprocessError::Decode("image payload is empty".into()));
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_image_side);
        limits.max_image_height = Some(self.max_image_side);
        limits.max_alloc = Some(self.max_decode_bytes);

        let mut reader = image::ImageReader::new(Cursor::new(image_data))
            .with_guessed_format()
            .map_err(|e| PreprocessError::Decode(e.to_string()))?;
        reader.limits(limits);
        reader
            .decode()
            .map_err(|e| PreprocessError::Decode(e.to_string()))
    }
}

/// Scales the shorter side to `target`; the longer side is truncated like torchvision does.
fn resize_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale = |long: u32, short: u32| {
        ((target as u64 * long as u64) / short as u64).clamp(1, u32::MAX as u64) as u32
    };
    if width <= height {
        (target, scale(height, width))
    } else {
        (scale(width, height), target)
    }
}

fn center_offset(length: u32, crop: u32) -> u32 {
    ((length - crop) as f64 / 2.0).round_ties_even() as u32
}

/// Offset and length along one source axis of the centered `crop` taken from that axis
/// resized to `resized`. The window is at least one pixel and stays inside the source.
fn source_window(source: u32, resized: u32, crop: u32) -> (u32, u32) {
    let scale = source as f64 / resized as f64;
    let length = ((crop as f64 * scale).round() as u32).clamp(1, source);
    let offset = (center_offset(resized, crop) as f64 * scale).round() as u32;
    (offset.min(source - length), length)
}
