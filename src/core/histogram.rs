use crate::core::error::Result;
use crate::core::image::{decode_path, downsample};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const BUCKETS: usize = 256;

/// Largest possible per-bucket squared-difference average, used to scale
/// [`ColorHistogram::variance`] into 0..=1.
const MAX_VARIANCE: f64 = 512.0;

/// Per-channel 256-bucket counts over the 16x16 color downsample.
///
/// Every channel sums to 256, one count per sampled cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorHistogram {
    red: Vec<u32>,
    green: Vec<u32>,
    blue: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "Red",
            Channel::Green => "Green",
            Channel::Blue => "Blue",
        }
    }
}

impl ColorHistogram {
    pub fn from_image(img: &DynamicImage) -> Self {
        let sample = downsample(img);
        let mut histogram = Self {
            red: vec![0; BUCKETS],
            green: vec![0; BUCKETS],
            blue: vec![0; BUCKETS],
        };
        for pixel in sample.pixels() {
            let [r, g, b] = pixel.0;
            histogram.red[usize::from(r)] += 1;
            histogram.green[usize::from(g)] += 1;
            histogram.blue[usize::from(b)] += 1;
        }
        histogram
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let img = decode_path(path)?;
        Ok(Self::from_image(&img))
    }

    pub fn red(&self) -> &[u32] {
        &self.red
    }

    pub fn green(&self) -> &[u32] {
        &self.green
    }

    pub fn blue(&self) -> &[u32] {
        &self.blue
    }

    pub fn channel(&self, channel: Channel) -> &[u32] {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    /// Largest bucket of each channel, in red, green, blue order.
    pub fn max_values(&self) -> [u32; 3] {
        Channel::ALL.map(|c| self.channel(c).iter().copied().max().unwrap_or(0))
    }

    /// Mean squared bucket difference against `other`, averaged over the three
    /// channels and scaled so a white image against a black one is near 1.
    pub fn variance(&self, other: &ColorHistogram) -> f32 {
        let channel_variance = |a: &[u32], b: &[u32]| -> f64 {
            let squared: f64 = a
                .iter()
                .zip(b)
                .map(|(&a, &b)| (f64::from(a) - f64::from(b)).powi(2))
                .sum();
            squared / BUCKETS as f64 / MAX_VARIANCE
        };

        let total: f64 = Channel::ALL
            .iter()
            .map(|&c| channel_variance(self.channel(c), other.channel(c)))
            .sum();
        (total / 3.0) as f32
    }
}

/// One `RGB iii : (rrr,ggg,bbb)` line per bucket.
impl fmt::Display for ColorHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..BUCKETS {
            writeln!(
                f,
                "RGB {:>3} : ({:>3},{:>3},{:>3})",
                i, self.red[i], self.green[i], self.blue[i]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb(color)))
    }

    #[test]
    fn test_every_channel_sums_to_sample_count() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(90, 70, |x, y| {
            Rgb([(x * 3) as u8, (y * 2) as u8, ((x * y) % 256) as u8])
        }));
        let histogram = ColorHistogram::from_image(&img);
        for channel in Channel::ALL {
            assert_eq!(histogram.channel(channel).iter().sum::<u32>(), 256);
        }
    }

    #[test]
    fn test_solid_image_fills_one_bucket() {
        let histogram = ColorHistogram::from_image(&solid([10, 20, 30]));
        assert_eq!(histogram.red()[10], 256);
        assert_eq!(histogram.green()[20], 256);
        assert_eq!(histogram.blue()[30], 256);
        assert_eq!(histogram.max_values(), [256, 256, 256]);
    }

    #[test]
    fn test_variance_against_self_is_zero() {
        let histogram = ColorHistogram::from_image(&solid([1, 2, 3]));
        assert_eq!(histogram.variance(&histogram), 0.0);
    }

    #[test]
    fn test_variance_white_against_black() {
        let white = ColorHistogram::from_image(&solid([255, 255, 255]));
        let black = ColorHistogram::from_image(&solid([0, 0, 0]));
        // Two buckets per channel differ by 256: 2 * 65536 / 256 / 512 = 1.
        assert!((white.variance(&black) - 1.0).abs() < 1e-6);
        assert_eq!(white.variance(&black), black.variance(&white));
    }

    #[test]
    fn test_display_table() {
        let histogram = ColorHistogram::from_image(&solid([0, 1, 2]));
        let text = histogram.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 256);
        assert_eq!(lines[0], "RGB   0 : (256,  0,  0)");
        assert_eq!(lines[2], "RGB   2 : (  0,  0,256)");
    }
}
