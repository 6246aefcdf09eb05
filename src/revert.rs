//! Undo of previous runs
//!
//! Replays the journal of a directory newest record first, renaming every
//! file back, then removes the directories left empty by sorting.

use crate::collision::RenameEntry;
use crate::journal::{Journal, JournalRecord};
use crate::process::canonical_directory;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, error, info, span, warn};
use walkdir::WalkDir;

/// Overall result of a revert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    /// Every record was replayed
    Success,
    /// The directory was never processed, nothing was touched
    NoHistory,
    /// Some records could not be replayed; they are left in place
    Failure,
}

/// A journal pair that could not be restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairFailure {
    pub entry: RenameEntry,
    pub reason: String,
}

/// Outcome of a revert run
#[derive(Debug, Clone)]
pub struct RevertReport {
    pub outcome: RevertOutcome,
    /// Files renamed back
    pub restored: usize,
    /// Pairs skipped because a file moved or the old name is taken
    pub pair_failures: Vec<PairFailure>,
    /// Records that could not be read or deleted and were kept
    pub failed_records: Vec<PathBuf>,
    /// Empty directories removed after the replay
    pub removed_directories: Vec<PathBuf>,
    /// Set when the history could not be reached at all
    pub error: Option<String>,
}

impl RevertReport {
    fn new(outcome: RevertOutcome) -> Self {
        Self {
            outcome,
            restored: 0,
            pair_failures: Vec::new(),
            failed_records: Vec::new(),
            removed_directories: Vec::new(),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(RevertOutcome::Failure)
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Restored: {}, Skipped pairs: {}, Kept records: {}, Removed directories: {}",
            self.restored,
            self.pair_failures.len(),
            self.failed_records.len(),
            self.removed_directories.len()
        )
    }
}

/// Undo every recorded run of `directory`
///
/// Never fails as a whole: a problem with one record is logged, the record
/// is kept and the outcome becomes `Failure`, the other records still replay.
pub fn revert_directory(directory: &Path) -> RevertReport {
    let directory = match canonical_directory(directory) {
        Ok(directory) => directory,
        Err(e) => {
            error!(?directory, error = %e, "Cannot open directory for revert");
            return RevertReport::failed(e.to_string());
        }
    };
    let _span = span!(Level::INFO, "revert_run", ?directory).entered();

    let journal = Journal::new(&directory);
    if !journal.exists() {
        info!("No history found, nothing to revert");
        return RevertReport::new(RevertOutcome::NoHistory);
    }

    let records = match journal.records() {
        Ok(records) => records,
        Err(e) => {
            error!(history = ?journal.path(), error = %e, "Cannot list journal records");
            return RevertReport::failed(e.to_string());
        }
    };

    let mut report = RevertReport::new(RevertOutcome::Success);

    for record_file in records.into_iter().rev() {
        let record = match JournalRecord::load(&record_file.path) {
            Ok(record) => record,
            Err(e) => {
                error!(
                    record = ?record_file.path,
                    error = %e,
                    "Cannot read journal record, keeping it"
                );
                report.failed_records.push(record_file.path);
                report.outcome = RevertOutcome::Failure;
                continue;
            }
        };

        info!(
            record = ?record_file.path,
            entries = record.entries().len(),
            "Replaying journal record"
        );
        for entry in record.entries().iter().rev() {
            match restore(entry) {
                Ok(()) => report.restored += 1,
                Err(reason) => {
                    warn!(
                        old = ?entry.old_path,
                        new = ?entry.new_path,
                        %reason,
                        "Cannot restore file, skipping"
                    );
                    report.pair_failures.push(PairFailure {
                        entry: entry.clone(),
                        reason,
                    });
                }
            }
        }

        match fs::remove_file(&record_file.path) {
            Ok(()) => debug!(record = ?record_file.path, "Journal record consumed"),
            Err(e) => {
                error!(record = ?record_file.path, error = %e, "Cannot delete journal record");
                report.failed_records.push(record_file.path);
                report.outcome = RevertOutcome::Failure;
            }
        }
    }

    report.removed_directories = remove_empty_directories(&directory);

    info!("{}", report.summary());
    report
}

/// Rename one journal pair back; never overwrites
fn restore(entry: &RenameEntry) -> std::result::Result<(), String> {
    if fs::symlink_metadata(&entry.new_path).is_err() {
        return Err("renamed file no longer exists".to_string());
    }
    if fs::symlink_metadata(&entry.old_path).is_ok() {
        return Err("original name is taken".to_string());
    }
    if let Some(parent) = entry.old_path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    fs::rename(&entry.new_path, &entry.old_path).map_err(|e| e.to_string())?;
    debug!(from = ?entry.new_path, to = ?entry.old_path, "Restored");
    Ok(())
}

/// Remove every empty directory below `root`, deepest first; `root` stays
pub fn remove_empty_directories(root: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Cannot access entry during cleanup");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let is_empty = match fs::read_dir(path) {
            Ok(mut children) => children.next().is_none(),
            Err(e) => {
                warn!(?path, error = %e, "Cannot list directory during cleanup");
                false
            }
        };
        if !is_empty {
            continue;
        }

        match fs::remove_dir(path) {
            Ok(()) => {
                debug!(?path, "Removed empty directory");
                removed.push(path.to_path_buf());
            }
            Err(e) => warn!(?path, error = %e, "Cannot remove empty directory"),
        }
    }

    removed
}
