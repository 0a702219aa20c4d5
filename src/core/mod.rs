pub mod duplicate;
pub mod error;
pub mod fingerprint;
pub mod grid;
pub mod histogram;
pub mod image;
pub mod metrics;
pub mod scanner;
pub mod visualize;
