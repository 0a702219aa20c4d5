//! Near-duplicate image detection.
//!
//! Every image is reduced to a 16x16 grayscale [`Fingerprint`]. Fingerprints
//! are compared cell by cell ([metrics](crate::core::metrics)), and a collection of them is
//! clustered into duplicate groups by sorting and scanning once
//! ([`find_duplicate_groups`]).

pub mod compare;
pub mod config;
pub mod core;

pub use crate::config::Config;
pub use crate::core::duplicate::{
    find_duplicate_groups, DuplicateDetector, DuplicateReport, ExtractionProgress, FailurePolicy,
    SkippedImage,
};
pub use crate::core::error::{CompareError, Result};
pub use crate::core::fingerprint::{Fingerprint, FINGERPRINT_SIZE};
pub use crate::core::grid::{compare_optional, Grid};
pub use crate::core::histogram::ColorHistogram;
pub use crate::core::metrics::{
    bhattacharyya_distance, difference_grid, percentage_difference, DEFAULT_THRESHOLD,
};
pub use crate::core::visualize::{DifferenceOptions, DifferenceReport};
