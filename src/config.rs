//! Settings shared by the library entry points and the command line.

use crate::core::duplicate::{DuplicateDetector, FailurePolicy};
use crate::core::error::{CompareError, Result};
use crate::core::metrics::DEFAULT_THRESHOLD;
use crate::core::scanner::default_extensions;
use crate::core::visualize::DifferenceOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Cell differences at or below this value are ignored.
    pub threshold: u8,
    /// Search sub-directories when scanning a folder.
    pub recursive: bool,
    /// File extensions considered images (case-insensitive).
    pub extensions: Vec<String>,
    pub on_decode_error: FailurePolicy,
    /// Extraction workers (0 = one per core).
    pub threads: usize,
    pub adjust_color_scheme: bool,
    pub absolute_text: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            recursive: false,
            extensions: default_extensions(),
            on_decode_error: FailurePolicy::Skip,
            threads: 0,
            adjust_color_scheme: false,
            absolute_text: false,
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CompareError::io(path, e))?;
        Self::from_json(&text).map_err(|e| match e {
            CompareError::Config { message } => CompareError::Config {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| CompareError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(CompareError::Config {
                message: "at least one image extension is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn difference_options(&self) -> DifferenceOptions {
        DifferenceOptions {
            adjust_color_scheme: self.adjust_color_scheme,
            absolute_text: self.absolute_text,
        }
    }

    pub fn detector(&self) -> DuplicateDetector {
        DuplicateDetector::new()
            .with_failure_policy(self.on_decode_error)
            .with_threads(self.threads)
            .with_recursive(self.recursive)
            .with_extensions(self.extensions.clone())
    }
}
