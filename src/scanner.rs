use anyhow::Result;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use datashape_analyzer::FileScanner;
use datashape_core::Language;
use datashape_reports::{Detection, ScanSummary};

use crate::config::IdStrategy;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub languages: Vec<Language>,
    pub concurrency: usize,
    pub max_file_size: u64,
    pub id_strategy: IdStrategy,
    pub show_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            languages: Language::SUPPORTED.to_vec(),
            concurrency: 8,
            max_file_size: 2_000_000,
            id_strategy: IdStrategy::Uuid,
            show_progress: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Detections grouped by file, files in input order.
    pub detections: Vec<Detection>,
    pub summary: ScanSummary,
}

/// Scan `files` concurrently. Filenames in the output are relative to `root`.
///
/// A file that cannot be read or parsed yields an `error` detection; the scan
/// carries on with the remaining files.
pub async fn scan_files(root: &Path, files: Vec<PathBuf>, scanner: FileScanner, options: &ScanOptions) -> ScanOutcome {
    let progress_bar = if options.show_progress {
        ProgressBar::new(files.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}") {
        progress_bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    progress_bar.set_message("Scanning files...");

    let mut results: Vec<(usize, Option<Vec<Detection>>)> = stream::iter(files.into_iter().enumerate())
        .map(|(idx, path)| {
            let scanner = scanner.clone();
            let options = options.clone();
            let display_name = relative_name(root, &path);
            let progress_bar = progress_bar.clone();

            async move {
                let name = display_name.clone();
                let task = tokio::task::spawn_blocking(move || scan_one(&scanner, &path, &name, &options));
                let detections = match task.await {
                    Ok(Ok(detections)) => detections,
                    Ok(Err(e)) => Some(vec![Detection::Error {
                        file: display_name.clone(),
                        message: e.to_string(),
                    }]),
                    Err(e) => Some(vec![Detection::Error {
                        file: display_name.clone(),
                        message: format!("scan task failed: {}", e),
                    }]),
                };
                progress_bar.inc(1);
                (idx, detections)
            }
        })
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    progress_bar.finish_and_clear();
    results.sort_by_key(|(idx, _)| *idx);

    let mut outcome = ScanOutcome::default();
    for detections in results.into_iter().filter_map(|(_, detections)| detections) {
        outcome.summary.add_file(&detections);
        outcome.detections.extend(detections);
    }
    outcome
}

/// `None` when the file is skipped.
fn scan_one(scanner: &FileScanner, path: &Path, name: &str, options: &ScanOptions) -> Result<Option<Vec<Detection>>> {
    let language = Language::from_filename(&path.to_string_lossy());
    if !options.languages.contains(&language) {
        log::debug!("{}: skipped, language not selected", name);
        return Ok(None);
    }

    let size = std::fs::metadata(path)?.len();
    if size > options.max_file_size {
        log::warn!("{}: skipped, {} bytes exceeds the size limit", name, size);
        return Ok(None);
    }

    let source = std::fs::read_to_string(path)?;
    let mut ids = options.id_strategy.generator();
    match scanner.scan_source(language, name, &source, ids.as_mut()) {
        Ok(detections) => Ok(Some(detections)),
        Err(e) => {
            log::warn!("{}: {}", name, e);
            Ok(Some(vec![Detection::Error {
                file: name.to_string(),
                message: e.to_string(),
            }]))
        }
    }
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = if root.is_file() {
        path.file_name().map(Path::new).unwrap_or(path)
    } else {
        path.strip_prefix(root).unwrap_or(path)
    };
    relative.to_string_lossy().to_string()
}
