//! Image preprocessing shared by training and inference
//!
//! Every image, whether it comes from a class folder, a zip archive or the
//! `classify` command, goes through [`to_chw`] so the model always sees the
//! same input layout.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::utils::error::{ClassifierError, Result};

/// File extensions treated as images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// ImageNet channel means
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Whether `path` has an image extension
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Resize to `size x size`, convert to RGB and lay out as CHW floats in [0, 1]
pub fn to_chw(img: &DynamicImage, size: usize) -> Vec<f32> {
    let rgb = img
        .resize_exact(size as u32, size as u32, FilterType::Triangle)
        .to_rgb8();

    let plane = size * size;
    let mut tensor = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * size + x as usize;
        tensor[offset] = pixel[0] as f32 / 255.0;
        tensor[plane + offset] = pixel[1] as f32 / 255.0;
        tensor[2 * plane + offset] = pixel[2] as f32 / 255.0;
    }

    tensor
}

/// Apply ImageNet normalization in place to a CHW buffer
pub fn normalize_chw(data: &mut [f32]) {
    let plane = data.len() / 3;
    if plane == 0 {
        return;
    }
    for (channel, chunk) in data.chunks_mut(plane).take(3).enumerate() {
        let (mean, std) = (IMAGENET_MEAN[channel], IMAGENET_STD[channel]);
        for value in chunk {
            *value = (*value - mean) / std;
        }
    }
}

/// Open, decode and convert an image file
pub fn load_image(path: &Path, size: usize) -> Result<Vec<f32>> {
    let img = ImageReader::open(path)
        .map_err(|e| ClassifierError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .with_guessed_format()
        .map_err(|e| ClassifierError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| ClassifierError::ImageLoad(path.to_path_buf(), e.to_string()))?;

    Ok(to_chw(&img, size))
}

/// Decode an in-memory encoded image (e.g. a zip entry); `name` is used in errors
pub fn decode_image(bytes: &[u8], name: &str, size: usize) -> Result<Vec<f32>> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ClassifierError::ImageLoad(name.into(), e.to_string()))?
        .decode()
        .map_err(|e| ClassifierError::ImageLoad(name.into(), e.to_string()))?;

    Ok(to_chw(&img, size))
}
