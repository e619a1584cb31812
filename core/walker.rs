use crate::classify::{self, Classification};
use crate::config::ProcessingOptions;
use crate::error::{AppError, Result};
use crate::filter::{PathFilter, slash_path};
use crate::render;
use log;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Included,
    SkippedLarge,
    SkippedBinary,
    SkippedIgnored,
    SkippedError,
    /// Eligible, but past the `max_files` cutoff.
    Omitted,
}

/// One visited file. Lives only for the duration of its visit.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipBreakdown {
    pub ignored: usize,
    pub large: usize,
    pub binary: usize,
    pub unreadable: usize,
}

impl SkipBreakdown {
    pub fn total(&self) -> usize {
        self.ignored + self.large + self.binary + self.unreadable
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    #[serde(skip)]
    pub aggregated_text: String,
    pub processed_count: usize,
    pub skipped_count: usize,
    pub omitted_count: usize,
    pub truncated_count: usize,
    pub bytes_emitted: u64,
    pub skipped: SkipBreakdown,
    /// Subdirectories whose children could not be listed, relative to the root.
    pub failed_directories: Vec<String>,
}

impl RunResult {
    pub fn visited_count(&self) -> usize {
        self.processed_count + self.skipped_count + self.omitted_count
    }

    fn record_skip(&mut self, status: EntryStatus) {
        match status {
            EntryStatus::SkippedIgnored => self.skipped.ignored += 1,
            EntryStatus::SkippedLarge => self.skipped.large += 1,
            EntryStatus::SkippedBinary => self.skipped.binary += 1,
            EntryStatus::SkippedError => self.skipped.unreadable += 1,
            EntryStatus::Included | EntryStatus::Omitted => return,
        }
        self.skipped_count += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    Idle,
    Walking,
    Succeeded,
    Failed,
}

/// Drives the whole pipeline over one materialized tree.
///
/// Within a directory all files are handled (sorted by name) before any
/// subdirectory is entered; subdirectories are then walked depth-first, also
/// in name order. Ignored directories are pruned before descending.
pub struct TreeWalker {
    options: ProcessingOptions,
    filter: PathFilter,
    state: WalkState,
}

impl TreeWalker {
    pub fn new(options: ProcessingOptions) -> Result<Self> {
        let filter = PathFilter::new(&options.ignore_patterns)?;
        Ok(Self {
            options,
            filter,
            state: WalkState::Idle,
        })
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn walk(&mut self, root: &Path) -> Result<RunResult> {
        self.walk_with(root, |_| {})
    }

    /// Like [`TreeWalker::walk`], calling `observer` once per visited file.
    pub fn walk_with<F>(&mut self, root: &Path, observer: F) -> Result<RunResult>
    where
        F: FnMut(&FileEntry),
    {
        self.state = WalkState::Walking;
        log::info!("Walking repository tree: {}", root.display());
        let outcome = self.traverse(root, observer);
        self.state = match &outcome {
            Ok(result) => {
                log::info!(
                    "Walk complete: {} processed, {} skipped, {} omitted.",
                    result.processed_count,
                    result.skipped_count,
                    result.omitted_count
                );
                WalkState::Succeeded
            }
            Err(e) => {
                log::error!("Walk failed: {}", e);
                WalkState::Failed
            }
        };
        outcome
    }

    fn traverse<F>(&self, root: &Path, mut observer: F) -> Result<RunResult>
    where
        F: FnMut(&FileEntry),
    {
        fs::read_dir(root).map_err(|e| root_listing_error(root, &e))?;

        let mut result = RunResult::default();
        let filter = &self.filter;

        let entries = WalkDir::new(root)
            .follow_links(false)
            .sort_by(files_before_directories)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let keep = !filter.is_ignored(&relative_to(entry.path(), root), true);
                if !keep {
                    log::debug!("Pruning ignored directory: {}", entry.path().display());
                }
                keep
            });

        for item in entries {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    let Some(path) = err.path().map(Path::to_path_buf) else {
                        log::warn!("Error walking directory: {}", err);
                        continue;
                    };
                    if path == root {
                        let io_err = err
                            .into_io_error()
                            .unwrap_or_else(|| std::io::Error::other("walk error"));
                        return Err(root_listing_error(root, &io_err));
                    }
                    let relative = relative_to(&path, root);
                    let is_dir = fs::symlink_metadata(&path).is_ok_and(|m| m.is_dir());
                    if is_dir {
                        log::warn!("Cannot list directory {}: {}", path.display(), err);
                        result.failed_directories.push(slash_path(&relative));
                    } else {
                        log::warn!("Cannot read entry {}: {}", path.display(), err);
                        let file_entry = FileEntry {
                            relative_path: slash_path(&relative),
                            absolute_path: path,
                            size_bytes: 0,
                            status: EntryStatus::SkippedError,
                        };
                        result.record_skip(file_entry.status);
                        observer(&file_entry);
                    }
                    continue;
                }
            };

            if entry.depth() == 0 || entry.file_type().is_dir() {
                continue;
            }
            if entry.file_type().is_symlink()
                && fs::metadata(entry.path()).is_ok_and(|m| m.is_dir())
            {
                log::debug!("Not following directory symlink: {}", entry.path().display());
                continue;
            }

            let file_entry = self.visit_file(&entry, root, &mut result);
            observer(&file_entry);
        }

        if result.omitted_count > 0 {
            result.aggregated_text.push_str(&render::render_cutoff_marker(
                result.omitted_count,
                self.options.max_files,
            ));
            result.aggregated_text.push_str(&render::render_summary_line(
                result.processed_count,
                result.skipped_count,
                result.omitted_count,
            ));
        }
        if !result.failed_directories.is_empty() {
            log::warn!(
                "{} subdirectories could not be listed and were skipped.",
                result.failed_directories.len()
            );
        }

        Ok(result)
    }

    fn visit_file(&self, entry: &DirEntry, root: &Path, result: &mut RunResult) -> FileEntry {
        let relative = relative_to(entry.path(), root);
        let mut file_entry = FileEntry {
            relative_path: slash_path(&relative),
            absolute_path: entry.path().to_path_buf(),
            size_bytes: 0,
            status: EntryStatus::SkippedError,
        };

        let size = fs::metadata(entry.path()).map(|m| m.len());
        if let Ok(size) = &size {
            file_entry.size_bytes = *size;
        }

        if self.filter.is_ignored(&relative, false) {
            log::trace!("Ignored file: {}", file_entry.relative_path);
            file_entry.status = EntryStatus::SkippedIgnored;
            result.record_skip(file_entry.status);
            return file_entry;
        }

        if let Err(e) = size {
            log::debug!("Cannot stat {}: {}", file_entry.relative_path, e);
            result.record_skip(file_entry.status);
            return file_entry;
        }

        let probe = classify::probe_file(entry.path());
        let classification = classify::classify(file_entry.size_bytes, probe, &self.options);
        file_entry.status = match classification {
            Classification::SkipLarge => EntryStatus::SkippedLarge,
            Classification::SkipBinary => EntryStatus::SkippedBinary,
            Classification::SkipUnreadable => EntryStatus::SkippedError,
            Classification::IncludeFull | Classification::IncludeTruncated => {
                if self.cutoff_reached(result) {
                    EntryStatus::Omitted
                } else {
                    self.emit(&file_entry, classification, result)
                }
            }
        };

        match file_entry.status {
            EntryStatus::Included => {}
            EntryStatus::Omitted => {
                log::trace!("Omitted past max-files: {}", file_entry.relative_path);
                result.omitted_count += 1;
            }
            status => {
                log::debug!("Skipped {} ({:?})", file_entry.relative_path, status);
                result.record_skip(status);
            }
        }
        file_entry
    }

    fn cutoff_reached(&self, result: &RunResult) -> bool {
        self.options.max_files > 0 && result.processed_count >= self.options.max_files
    }

    /// Reads, decodes and renders one file. Returns the resulting status.
    fn emit(
        &self,
        file_entry: &FileEntry,
        classification: Classification,
        result: &mut RunResult,
    ) -> EntryStatus {
        let truncated = classification == Classification::IncludeTruncated;
        let limit = truncated.then_some(self.options.size_threshold_bytes);

        let bytes = match classify::read_limited(&file_entry.absolute_path, limit) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("Cannot read {}: {}", file_entry.relative_path, e);
                return EntryStatus::SkippedError;
            }
        };
        let Some(content) = classify::decode_content(bytes, self.options.include_all, truncated)
        else {
            log::debug!("Cannot decode {} as UTF-8", file_entry.relative_path);
            return EntryStatus::SkippedError;
        };

        result.aggregated_text.push_str(&render::render_fragment(
            &file_entry.relative_path,
            file_entry.size_bytes,
            &content,
            truncated,
        ));
        result.processed_count += 1;
        result.bytes_emitted += content.len() as u64;
        if truncated {
            result.truncated_count += 1;
        }
        log::trace!("Included {}", file_entry.relative_path);
        EntryStatus::Included
    }
}

fn files_before_directories(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf())
}

fn root_listing_error(root: &Path, err: &std::io::Error) -> AppError {
    AppError::Processing(format!(
        "Cannot list repository root '{}': {}",
        root.display(),
        err
    ))
}
