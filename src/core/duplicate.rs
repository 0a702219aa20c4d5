// Duplicate detection by exact fingerprint equality.
//
// Instead of comparing every pair, fingerprints are sorted with the grid
// comparator so equal ones become adjacent, then a single scan collects runs.

use crate::core::error::{CompareError, Result};
use crate::core::fingerprint::Fingerprint;
use crate::core::scanner::{default_extensions, discover_images};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Group identifiers whose fingerprints are equal. Only runs of two or more
/// are returned; groups come out in fingerprint order, not input order.
pub fn find_duplicate_groups<I>(mut items: Vec<(I, Fingerprint)>) -> Vec<Vec<I>> {
    items.sort_unstable_by(|a, b| a.1.cmp(&b.1));

    let mut groups = Vec::new();
    let mut run: Vec<(I, Fingerprint)> = Vec::new();

    for item in items {
        // Equality is transitive and equal items are adjacent, so checking the
        // run's first member is enough.
        let breaks_run = run.first().is_some_and(|first| first.1 != item.1);
        if breaks_run {
            flush_run(&mut run, &mut groups);
        }
        run.push(item);
    }
    flush_run(&mut run, &mut groups);

    groups
}

fn flush_run<I>(run: &mut Vec<(I, Fingerprint)>, groups: &mut Vec<Vec<I>>) {
    if run.len() > 1 {
        groups.push(run.drain(..).map(|(id, _)| id).collect());
    } else {
        run.clear();
    }
}

/// What to do when one image in a batch cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log, record the path in the report, keep going.
    #[default]
    Skip,
    /// Fail the whole batch. Units not yet started are dropped, and the
    /// error returned is the first failure in input order among the units
    /// that ran.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub generated_at: DateTime<Utc>,
    pub images_examined: usize,
    pub groups: Vec<Vec<PathBuf>>,
    pub skipped: Vec<SkippedImage>,
}

impl DuplicateReport {
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionProgress {
    pub completed: usize,
    pub total: usize,
    pub current_file: PathBuf,
}

pub type ProgressCallback = Box<dyn Fn(ExtractionProgress) + Send + Sync>;

pub struct DuplicateDetector {
    failure_policy: FailurePolicy,
    threads: usize,
    recursive: bool,
    extensions: Vec<String>,
    cancellation_token: Arc<AtomicBool>,
    progress_callback: Option<ProgressCallback>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            threads: 0,
            recursive: false,
            extensions: default_extensions(),
            cancellation_token: Arc::new(AtomicBool::new(false)),
            progress_callback: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Worker count for extraction; 0 lets rayon decide.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::Relaxed)
    }

    /// Discover images under `dir` and group the duplicates among them.
    pub fn find_in_directory(&self, dir: &Path) -> Result<DuplicateReport> {
        let paths = discover_images(dir, self.recursive, &self.extensions, &self.cancellation_token)?;
        self.find_duplicates(&paths)
    }

    /// Fingerprint every path (in parallel) and group the duplicates.
    pub fn find_duplicates(&self, paths: &[PathBuf]) -> Result<DuplicateReport> {
        if self.is_cancelled() {
            return Err(CompareError::Cancelled);
        }

        let (fingerprints, skipped) = self.extract_all(paths)?;

        if self.is_cancelled() {
            return Err(CompareError::Cancelled);
        }

        let groups = find_duplicate_groups(fingerprints);
        log::info!(
            "Examined {} image(s): {} duplicate group(s), {} skipped",
            paths.len(),
            groups.len(),
            skipped.len()
        );

        Ok(DuplicateReport {
            generated_at: Utc::now(),
            images_examined: paths.len(),
            groups,
            skipped,
        })
    }

    /// Extract fingerprints on a bounded worker pool, one unit per image.
    pub fn extract_all(
        &self,
        paths: &[PathBuf],
    ) -> Result<(Vec<(PathBuf, Fingerprint)>, Vec<SkippedImage>)> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| CompareError::Config {
                message: format!("failed to build worker pool: {}", e),
            })?;

        let total = paths.len();
        let completed = AtomicUsize::new(0);
        let aborted = AtomicBool::new(false);

        // `None` marks work that never ran because the batch was cancelled or
        // an earlier failure aborted it.
        let results: Vec<Option<Result<Fingerprint>>> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    if self.is_cancelled() || aborted.load(Ordering::Relaxed) {
                        return None;
                    }

                    let fingerprint = Fingerprint::from_path(path);
                    if fingerprint.is_err() && self.failure_policy == FailurePolicy::Abort {
                        aborted.store(true, Ordering::Relaxed);
                    }

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    log::debug!("Fingerprinted {}/{}: {}", done, total, path.display());
                    self.report_progress(ExtractionProgress {
                        completed: done,
                        total,
                        current_file: path.clone(),
                    });

                    Some(fingerprint)
                })
                .collect()
        });

        if self.is_cancelled() {
            return Err(CompareError::Cancelled);
        }

        let mut fingerprints = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (path, result) in paths.iter().zip(results) {
            match result {
                None => continue,
                Some(Ok(fingerprint)) => fingerprints.push((path.clone(), fingerprint)),
                Some(Err(e)) => match self.failure_policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Skip => {
                        log::warn!("Skipping {}: {}", path.display(), e);
                        skipped.push(SkippedImage {
                            path: path.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok((fingerprints, skipped))
    }

    fn report_progress(&self, progress: ExtractionProgress) {
        if let Some(callback) = &self.progress_callback {
            // A misbehaving callback must not take the batch down with it.
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(progress);
            })) {
                log::warn!("Progress callback panicked: {:?}", e);
            }
        }
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}
