//! 16x16 grayscale fingerprints.
//!
//! A fingerprint is the coarse lightness thumbnail of an image: downsample to
//! 16x16 with bicubic interpolation, convert to grayscale, read one channel
//! per cell. Two images are duplicates when their fingerprints are equal.

use crate::core::error::{CompareError, Result};
use crate::core::grid::Grid;
use crate::core::image::{decode_bytes, decode_path, downsample, sample_pixel, to_grayscale};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

pub const FINGERPRINT_SIZE: usize = 16;
pub const FINGERPRINT_CELLS: usize = FINGERPRINT_SIZE * FINGERPRINT_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(Grid<u8>);

impl Fingerprint {
    pub fn from_image(img: &DynamicImage) -> Self {
        let gray = to_grayscale(&downsample(img));
        // R == G == B after grayscale, so red alone defines the lightness.
        Self(Grid::from_fn(FINGERPRINT_SIZE, FINGERPRINT_SIZE, |x, y| {
            sample_pixel(&gray, x as u32, y as u32).0
        }))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let img = decode_path(path)?;
        Ok(Self::from_image(&img))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = decode_bytes(bytes)?;
        Ok(Self::from_image(&img))
    }

    /// Wrap an existing grid; it must be exactly 16x16.
    pub fn from_grid(grid: Grid<u8>) -> Result<Self> {
        if grid.dimensions() != (FINGERPRINT_SIZE, FINGERPRINT_SIZE)
            || grid.len() != FINGERPRINT_CELLS
        {
            return Err(CompareError::ShapeMismatch {
                expected: (FINGERPRINT_SIZE, FINGERPRINT_SIZE),
                found: grid.dimensions(),
            });
        }
        Ok(Self(grid))
    }

    pub fn grid(&self) -> &Grid<u8> {
        &self.0
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.0[(x, y)]
    }

    pub fn sum(&self) -> u32 {
        self.0.iter().map(u32::from).sum()
    }

    /// True for a fingerprint whose every cell is zero.
    pub fn is_black(&self) -> bool {
        self.0.iter().all(|v| v == 0)
    }

    /// Scale the cells so they sum to 1.
    ///
    /// An all-black fingerprint has no mass to distribute and is rejected.
    pub fn normalized(&self) -> Result<Grid<f64>> {
        let total = f64::from(self.sum());
        if total == 0.0 {
            return Err(CompareError::DegenerateInput {
                reason: "fingerprint sums to zero (all-black image)".to_string(),
            });
        }
        Ok(self.0.map(|v| f64::from(v) / total))
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim();
        if hex.len() != FINGERPRINT_CELLS * 2 {
            return Err(CompareError::InvalidFingerprint {
                message: format!(
                    "expected {} hex characters, got {}",
                    FINGERPRINT_CELLS * 2,
                    hex.len()
                ),
            });
        }

        let cells = (0..hex.len())
            .step_by(2)
            .map(|i| {
                hex.get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| CompareError::InvalidFingerprint {
                        message: format!("invalid hex at offset {}", i),
                    })
            })
            .collect::<Result<Vec<u8>>>()?;

        Self::from_grid(Grid::from_cells(FINGERPRINT_SIZE, FINGERPRINT_SIZE, cells)?)
    }
}

impl Ord for Fingerprint {
    fn cmp(&self, other: &Self) -> Ordering {
        // Both grids are 16x16, so the shape check cannot fail.
        self.0.compare(&other.0).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Fingerprint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = CompareError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let intensity = ((x + y) % 256) as u8;
            Rgb([intensity, intensity / 2, 255 - intensity])
        }))
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let img = gradient(320, 200);
        assert_eq!(Fingerprint::from_image(&img), Fingerprint::from_image(&img));
    }

    #[test]
    fn test_solid_image_gives_uniform_grid() {
        let fp = Fingerprint::from_image(&solid(100, 50, [255, 0, 0]));
        assert!(fp.grid().iter().all(|v| v == 77));
        assert_eq!(fp.grid().dimensions(), (16, 16));
    }

    #[test]
    fn test_cells_follow_source_layout() {
        // Left half white, right half black at native sample size.
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(16, 16, |x, _| {
            if x < 8 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        }));
        let fp = Fingerprint::from_image(&img);
        assert_eq!(fp.get(0, 15), 255);
        assert_eq!(fp.get(15, 0), 0);
    }

    #[test]
    fn test_normalized_sums_to_one() {
        let fp = Fingerprint::from_image(&gradient(64, 64));
        let total: f64 = fp.normalized().unwrap().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_rejects_black() {
        let fp = Fingerprint::from_image(&solid(20, 20, [0, 0, 0]));
        assert!(fp.is_black());
        assert!(matches!(
            fp.normalized(),
            Err(CompareError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_hex_form_parses_back() {
        let fp = Fingerprint::from_image(&gradient(40, 30));
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 512);
        assert_eq!(Fingerprint::from_hex(&hex).unwrap(), fp);
        assert!(Fingerprint::from_hex("abc").is_err());
        assert!(Fingerprint::from_hex(&"zz".repeat(256)).is_err());
    }

    #[test]
    fn test_from_grid_rejects_wrong_shape() {
        let err = Fingerprint::from_grid(Grid::filled(8, 8, 0)).unwrap_err();
        assert!(matches!(err, CompareError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_from_grid_rejects_short_deserialized_grid() {
        let short = serde_json::from_str::<Grid<u8>>(r#"{"width":16,"height":16,"cells":[1,2,3]}"#);
        assert!(short.is_err());

        let full = format!(r#"{{"width":16,"height":16,"cells":[{}]}}"#, vec!["7"; 256].join(","));
        let grid: Grid<u8> = serde_json::from_str(&full).unwrap();
        let fp = Fingerprint::from_grid(grid).unwrap();
        assert_eq!(fp.get(15, 15), 7);
    }

    #[test]
    fn test_ordering_matches_grid_comparator() {
        let dark = Fingerprint::from_image(&solid(16, 16, [10, 10, 10]));
        let light = Fingerprint::from_image(&solid(16, 16, [200, 200, 200]));
        assert!(dark < light);
        assert_eq!(dark.cmp(&dark.clone()), Ordering::Equal);
    }
}
