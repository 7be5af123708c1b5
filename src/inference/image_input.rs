//! Image Preprocessor
//!
//! Decodes uploaded bytes (format sniffed from the content), converts to
//! RGB, resizes to 224×224 and scales pixels to [0, 1]. Output layout is NHWC:
//! `[1, 224, 224, 3]` flattened with channels interleaved per pixel.

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use thiserror::Error;

pub const IMAGE_SIZE: u32 = 224;
pub const IMAGE_INPUT_SHAPE: [usize; 4] = [1, IMAGE_SIZE as usize, IMAGE_SIZE as usize, 3];

#[derive(Debug, Error)]
pub enum ImageInputError {
    #[error("uploaded file is empty")]
    Empty,
    #[error("could not read image: {0}")]
    Decode(String),
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ImageInputError> {
    if bytes.is_empty() {
        return Err(ImageInputError::Empty);
    }
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageInputError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| ImageInputError::Decode(e.to_string()))
}

/// Resize + normalize an already decoded image to NHWC f32
pub fn image_to_tensor(image: &DynamicImage) -> Vec<f32> {
    let rgb = image
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle)
        .to_rgb8();

    rgb.pixels()
        .flat_map(|pixel| pixel.0)
        .map(|channel| channel as f32 / 255.0)
        .collect()
}

pub fn preprocess_image(bytes: &[u8]) -> Result<Vec<f32>, ImageInputError> {
    decode_image(bytes).map(|image| image_to_tensor(&image))
}
