//! Path-level entry points: each checks that its inputs exist, decodes them,
//! and runs one metric. Errors are returned, never swallowed.

use crate::core::error::{CompareError, Result};
use crate::core::fingerprint::Fingerprint;
use crate::core::grid::Grid;
use crate::core::metrics;
use image::DynamicImage;
use std::path::Path;

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CompareError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn fingerprint_pair(a: &Path, b: &Path) -> Result<(Fingerprint, Fingerprint)> {
    ensure_exists(a)?;
    ensure_exists(b)?;
    Ok((Fingerprint::from_path(a)?, Fingerprint::from_path(b)?))
}

pub fn difference_grid(a: &DynamicImage, b: &DynamicImage) -> Grid<u8> {
    metrics::difference_grid(&Fingerprint::from_image(a), &Fingerprint::from_image(b))
}

pub fn percentage_difference(a: &DynamicImage, b: &DynamicImage, threshold: u8) -> f32 {
    metrics::percentage_difference(&Fingerprint::from_image(a), &Fingerprint::from_image(b), threshold)
}

pub fn bhattacharyya_distance(a: &DynamicImage, b: &DynamicImage) -> f32 {
    metrics::bhattacharyya_distance(&Fingerprint::from_image(a), &Fingerprint::from_image(b))
}

pub fn difference_grid_paths(a: &Path, b: &Path) -> Result<Grid<u8>> {
    let (a, b) = fingerprint_pair(a, b)?;
    Ok(metrics::difference_grid(&a, &b))
}

pub fn percentage_difference_paths(a: &Path, b: &Path, threshold: u8) -> Result<f32> {
    let (a, b) = fingerprint_pair(a, b)?;
    Ok(metrics::percentage_difference(&a, &b, threshold))
}

pub fn bhattacharyya_distance_paths(a: &Path, b: &Path) -> Result<f32> {
    let (a, b) = fingerprint_pair(a, b)?;
    Ok(metrics::bhattacharyya_distance(&a, &b))
}
