//! Presentation helpers: a serializable export of the difference grid and
//! bitmap renderings of it and of color histograms.
//!
//! Nothing here feeds back into fingerprints or duplicate detection.

use crate::core::error::{CompareError, Result};
use crate::core::grid::Grid;
use crate::core::histogram::{Channel, ColorHistogram, BUCKETS};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pixels per difference cell in the rendered bitmap.
pub const CELL_SIZE: u32 = 16;

/// Cell colors by intensity: `(i, i / 3, i / 2)`, black through bright pink.
pub const PALETTE: [[u8; 3]; 256] = build_palette();

const fn build_palette() -> [[u8; 3]; 256] {
    let mut palette = [[0u8; 3]; 256];
    let mut i = 0;
    while i < 256 {
        palette[i] = [i as u8, (i / 3) as u8, (i / 2) as u8];
        i += 1;
    }
    palette
}

const BORDER: Rgb<u8> = Rgb([0, 0, 255]);
const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

const HISTOGRAM_BAND_HEIGHT: u32 = 100;
const HISTOGRAM_MARGIN: u32 = 10;
const HISTOGRAM_WIDTH: u32 = 276;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferenceOptions {
    /// Scale colors to the largest difference found instead of 255.
    pub adjust_color_scheme: bool,
    /// Label cells with the raw value instead of `"{value}%"`.
    pub absolute_text: bool,
}

/// Everything a presentation layer needs to draw the difference grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReportRepr")]
pub struct DifferenceReport {
    pub width: usize,
    pub height: usize,
    /// Row-major absolute differences.
    pub cells: Vec<u8>,
    /// The difference mapped to the brightest color.
    pub max_difference: u8,
    /// Row-major [`PALETTE`] index per cell.
    pub color_index: Vec<u8>,
    pub labels: Vec<String>,
    pub cell_size: u32,
}

impl DifferenceReport {
    pub fn new(differences: &Grid<u8>, options: DifferenceOptions) -> Self {
        let max_difference = if options.adjust_color_scheme {
            differences.max_value().unwrap_or(0).max(1)
        } else {
            u8::MAX
        };

        let color_index = differences
            .iter()
            .map(|d| (u32::from(d.min(max_difference)) * 255 / u32::from(max_difference)) as u8)
            .collect();

        let labels = differences
            .iter()
            .map(|d| {
                if options.absolute_text {
                    d.to_string()
                } else {
                    format!("{}%", d)
                }
            })
            .collect();

        Self {
            width: differences.width(),
            height: differences.height(),
            cells: differences.cells().to_vec(),
            max_difference,
            color_index,
            labels,
            cell_size: CELL_SIZE,
        }
    }

    /// Palette color of cell `(x, y)`, or `None` outside the report.
    pub fn color_at(&self, x: usize, y: usize) -> Option<Rgb<u8>> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.color_index
            .get(y * self.width + x)
            .map(|&i| Rgb(PALETTE[usize::from(i)]))
    }

    /// Check that every per-cell vector covers the whole grid.
    pub fn validate(&self) -> Result<()> {
        let expected = self.width * self.height;
        for found in [self.cells.len(), self.color_index.len(), self.labels.len()] {
            if found != expected {
                return Err(CompareError::ShapeMismatch {
                    expected: (self.width, self.height),
                    found: (found, 1),
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct ReportRepr {
    width: usize,
    height: usize,
    cells: Vec<u8>,
    max_difference: u8,
    color_index: Vec<u8>,
    labels: Vec<String>,
    cell_size: u32,
}

impl TryFrom<ReportRepr> for DifferenceReport {
    type Error = CompareError;

    fn try_from(repr: ReportRepr) -> Result<Self> {
        let report = Self {
            width: repr.width,
            height: repr.height,
            cells: repr.cells,
            max_difference: repr.max_difference,
            color_index: repr.color_index,
            labels: repr.labels,
            cell_size: repr.cell_size,
        };
        report.validate()?;
        Ok(report)
    }
}

/// Render the report as colored cells with blue borders on a black canvas,
/// one extra pixel wide and tall for the closing border.
pub fn render_difference_image(report: &DifferenceReport) -> RgbImage {
    let cell = report.cell_size;
    let width = report.width as u32 * cell + 1;
    let height = report.height as u32 * cell + 1;
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    for y in 0..report.height {
        for x in 0..report.width {
            let left = (x as u32 * cell) as i32;
            let top = (y as u32 * cell) as i32;
            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(left, top).of_size(cell, cell),
                report.color_at(x, y).unwrap_or(BACKGROUND),
            );
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(left, top).of_size(cell + 1, cell + 1),
                BORDER,
            );
        }
    }
    canvas
}

fn channel_color(channel: Channel) -> Rgb<u8> {
    match channel {
        Channel::Red => Rgb([255, 0, 0]),
        Channel::Green => Rgb([0, 128, 0]),
        Channel::Blue => Rgb([0, 0, 255]),
    }
}

/// Three stacked bar charts (red, green, blue), each bar scaled to its
/// channel's largest bucket.
pub fn render_histogram(histogram: &ColorHistogram) -> RgbImage {
    let height = HISTOGRAM_BAND_HEIGHT * 3 + HISTOGRAM_MARGIN * 4;
    let band_offset = HISTOGRAM_MARGIN + HISTOGRAM_BAND_HEIGHT;
    let mut canvas = RgbImage::from_pixel(HISTOGRAM_WIDTH, height, Rgb([255, 255, 255]));

    let maxima = histogram.max_values();
    for (index, channel) in Channel::ALL.into_iter().enumerate() {
        let color = channel_color(channel);
        let baseline = (band_offset * (index as u32 + 1)) as f32;
        let max = maxima[index].max(1) as f32;

        for (bucket, &count) in histogram.channel(channel).iter().enumerate() {
            if count == 0 {
                continue;
            }
            let x = (HISTOGRAM_MARGIN as usize + bucket) as f32;
            let bar = count as f32 / max * HISTOGRAM_BAND_HEIGHT as f32;
            draw_line_segment_mut(&mut canvas, (x, baseline), (x, baseline - bar), color);
        }

        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(
                HISTOGRAM_MARGIN as i32,
                (band_offset * index as u32 + HISTOGRAM_MARGIN) as i32,
            )
            .of_size(BUCKETS as u32 + 1, HISTOGRAM_BAND_HEIGHT + 1),
            color,
        );
    }
    canvas
}

pub fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| CompareError::Render {
            message: format!("failed to write {}: {}", path.display(), e),
        })
}
