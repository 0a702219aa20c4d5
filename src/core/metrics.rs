//! Difference metrics between two fingerprints.

use crate::core::error::CompareError;
use crate::core::fingerprint::{Fingerprint, FINGERPRINT_CELLS};
use crate::core::grid::Grid;

/// Cell differences at or below this value are ignored by default.
pub const DEFAULT_THRESHOLD: u8 = 3;

/// Returned when exactly one side is an all-black image.
pub const DEGENERATE_DISTANCE: f32 = 1.0;

/// Per-cell absolute difference of two fingerprints.
pub fn difference_grid(a: &Fingerprint, b: &Fingerprint) -> Grid<u8> {
    Grid::from_fn(a.grid().width(), a.grid().height(), |x, y| {
        a.get(x, y).abs_diff(b.get(x, y))
    })
}

/// Fraction (0..=1, not 0..=100) of cells whose difference exceeds `threshold`.
pub fn percentage_difference(a: &Fingerprint, b: &Fingerprint, threshold: u8) -> f32 {
    fraction_above(&difference_grid(a, b), threshold)
}

pub fn fraction_above(differences: &Grid<u8>, threshold: u8) -> f32 {
    let differing = differences.iter().filter(|&d| d > threshold).count();
    differing as f32 / FINGERPRINT_CELLS as f32
}

/// Bhattacharyya coefficient `Σ sqrt(p_i * q_i)` of two normalized grids.
pub fn bhattacharyya_coefficient(p: &Grid<f64>, q: &Grid<f64>) -> Result<f64, CompareError> {
    let products = p.zip_with(q, |p, q| (p * q).sqrt())?;
    Ok(products.iter().sum())
}

/// Bhattacharyya distance between the normalized lightness grids of two
/// fingerprints, rounded to 8 decimal places before and after the square root.
///
/// Zero-sum (all-black) fingerprints cannot be normalized: two of them are at
/// distance 0, one against anything else is at [`DEGENERATE_DISTANCE`].
pub fn bhattacharyya_distance(a: &Fingerprint, b: &Fingerprint) -> f32 {
    let (p, q) = match (a.normalized(), b.normalized()) {
        (Ok(p), Ok(q)) => (p, q),
        (Err(_), Err(_)) => return 0.0,
        _ => return DEGENERATE_DISTANCE,
    };

    let coefficient = match bhattacharyya_coefficient(&p, &q) {
        Ok(c) => c,
        // Fingerprints are always 16x16.
        Err(_) => return DEGENERATE_DISTANCE,
    };

    let gap = round_to(1.0 - coefficient, 8).max(0.0);
    round_to(gap.sqrt(), 8) as f32
}

/// Round to `digits` decimals, ties to even.
fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round_ties_even() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn fingerprint_of(img: RgbImage) -> Fingerprint {
        Fingerprint::from_image(&DynamicImage::ImageRgb8(img))
    }

    fn solid(color: u8) -> Fingerprint {
        fingerprint_of(RgbImage::from_pixel(32, 32, Rgb([color, color, color])))
    }

    fn gray_with_spot(spot: u8) -> Fingerprint {
        fingerprint_of(RgbImage::from_fn(16, 16, |x, y| {
            if (x, y) == (5, 9) {
                Rgb([spot, spot, spot])
            } else {
                Rgb([128, 128, 128])
            }
        }))
    }

    fn pattern(seed: u32) -> Fingerprint {
        fingerprint_of(RgbImage::from_fn(48, 48, |x, y| {
            let v = ((x * 7 + y * 13 + seed * 31) % 200 + 20) as u8;
            Rgb([v, v.wrapping_add(seed as u8), 255 - v])
        }))
    }

    #[test]
    fn test_difference_grid_is_symmetric() {
        let (a, b) = (pattern(1), pattern(2));
        assert_eq!(difference_grid(&a, &b), difference_grid(&b, &a));
    }

    #[test]
    fn test_self_difference_is_zero() {
        let a = pattern(3);
        assert!(difference_grid(&a, &a).iter().all(|d| d == 0));
        assert_eq!(percentage_difference(&a, &a, DEFAULT_THRESHOLD), 0.0);
        assert_eq!(bhattacharyya_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_percentage_difference_is_symmetric() {
        let (a, b) = (pattern(4), pattern(9));
        assert_eq!(
            percentage_difference(&a, &b, DEFAULT_THRESHOLD),
            percentage_difference(&b, &a, DEFAULT_THRESHOLD)
        );
    }

    #[test]
    fn test_threshold_is_monotonic() {
        let (a, b) = (pattern(5), pattern(6));
        let mut previous = f32::INFINITY;
        for threshold in 0..=255u8 {
            let value = percentage_difference(&a, &b, threshold);
            assert!(value <= previous);
            assert!((0.0..=1.0).contains(&value));
            previous = value;
        }
    }

    #[test]
    fn test_single_spot_difference() {
        let white = gray_with_spot(255);
        let black = gray_with_spot(0);
        let diff = percentage_difference(&white, &black, DEFAULT_THRESHOLD);
        assert!((diff - 1.0 / 256.0).abs() < 1e-6);
        assert_eq!(percentage_difference(&white, &black, 255), 0.0);
    }

    #[test]
    fn test_bhattacharyya_is_bounded() {
        for (a, b) in [(1, 2), (3, 8), (10, 40)] {
            let d = bhattacharyya_distance(&pattern(a), &pattern(b));
            assert!((0.0..=1.0).contains(&d), "distance {} out of range", d);
        }
        let d = bhattacharyya_distance(&solid(255), &gray_with_spot(0));
        assert!((0.0..=1.0).contains(&d));
    }

    #[test]
    fn test_bhattacharyya_ignores_uniform_brightness() {
        // Normalization removes overall brightness: two solid images have the
        // same distribution.
        assert_eq!(bhattacharyya_distance(&solid(40), &solid(220)), 0.0);
    }

    #[test]
    fn test_bhattacharyya_degenerate_inputs() {
        let black = solid(0);
        assert_eq!(bhattacharyya_distance(&black, &black), 0.0);
        assert_eq!(bhattacharyya_distance(&black, &solid(90)), DEGENERATE_DISTANCE);
        assert_eq!(bhattacharyya_distance(&solid(90), &black), DEGENERATE_DISTANCE);
    }

    #[test]
    fn test_round_to_ties_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.123456789, 8), 0.12345679);
    }
}
