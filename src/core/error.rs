use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Grid shape mismatch: expected {}x{}, found {}x{}", expected.0, expected.1, found.0, found.1)]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Degenerate input: {reason}")]
    DegenerateInput { reason: String },

    #[error("Invalid fingerprint: {message}")]
    InvalidFingerprint { message: String },

    #[error("Rendering failed: {message}")]
    Render { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl CompareError {
    /// Map an IO error to `NotFound` when the path is missing, `Io` otherwise.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Anything that goes wrong after the file was opened, truncated reads
    /// included, counts as a decode failure.
    pub fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
