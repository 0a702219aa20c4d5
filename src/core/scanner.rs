use crate::core::error::{CompareError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// Collect image files under `root`, sorted by path.
///
/// Only the top level is searched unless `recursive` is set. Files are
/// matched on their lower-cased extension.
pub fn discover_images(
    root: &Path,
    recursive: bool,
    extensions: &[String],
    cancellation_token: &AtomicBool,
) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(CompareError::NotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(CompareError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let allowed: HashSet<String> = extensions.iter().map(|ext| ext.to_lowercase()).collect();
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut images = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                None
            }
        })
    {
        if cancellation_token.load(Ordering::Relaxed) {
            return Err(CompareError::Cancelled);
        }

        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
            if allowed.contains(&ext.to_lowercase()) {
                images.push(path.to_path_buf());
            }
        }
    }

    images.sort();
    log::debug!("Discovered {} image(s) under {}", images.len(), root.display());
    Ok(images)
}

pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}
