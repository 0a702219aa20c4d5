//! Thin wrappers over the `image` crate: the only imaging primitives the
//! fingerprinting code relies on.

use crate::core::error::{CompareError, Result};
use image::{imageops::FilterType, DynamicImage, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Side length of the downsampled sample grid.
pub const SAMPLE_SIZE: u32 = 16;

/// Luminance weights for R, G and B. The same mix is written to all three
/// output channels, so a grayscale pixel always has R == G == B.
pub const GRAYSCALE_WEIGHTS: [f32; 3] = [0.3, 0.59, 0.11];

/// Bicubic interpolation; deterministic for identical input.
const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Decode an image from a file, guessing the format from its contents.
pub fn decode_path(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(CompareError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if path.is_dir() {
        return Err(CompareError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::IsADirectory, "is a directory"),
        ));
    }

    ImageReader::open(path)
        .map_err(|e| CompareError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| CompareError::io(path, e))?
        .decode()
        .map_err(|e| CompareError::decode(path, e))
}

/// Decode an image held in memory.
pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompareError::io("<memory>", e))?
        .decode()
        .map_err(|e| CompareError::decode("<memory>", e))
}

/// Resize to exactly `width` x `height`, ignoring aspect ratio.
pub fn resize(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
    if img.width() == width && img.height() == height {
        return img.to_rgb8();
    }
    img.resize_exact(width, height, RESIZE_FILTER).to_rgb8()
}

/// The 16x16 color downsample shared by fingerprints and color histograms.
pub fn downsample(img: &DynamicImage) -> RgbImage {
    resize(img, SAMPLE_SIZE, SAMPLE_SIZE)
}

/// Weighted luminance of a single pixel.
pub fn luminance(pixel: Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    let value = f32::from(r) * GRAYSCALE_WEIGHTS[0]
        + f32::from(g) * GRAYSCALE_WEIGHTS[1]
        + f32::from(b) * GRAYSCALE_WEIGHTS[2];
    value.round().clamp(0.0, 255.0) as u8
}

pub fn to_grayscale(img: &RgbImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let gray = luminance(*img.get_pixel(x, y));
        Rgb([gray, gray, gray])
    })
}

pub fn sample_pixel(img: &RgbImage, x: u32, y: u32) -> (u8, u8, u8) {
    let [r, g, b] = img.get_pixel(x, y).0;
    (r, g, b)
}
