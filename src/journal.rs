//! Run journal for undo support
//!
//! Every run that renamed something leaves one record in the hidden
//! `.photosorter` directory of the processed directory:
//!
//! ```text
//! <dir>/.photosorter/1.json
//! <dir>/.photosorter/2.json
//! ```
//!
//! A record maps `file_<index>` keys to `{"OldName": ..., "NewName": ...}`
//! pairs, indices following the order the renames were executed in.
//! Records are immutable once written; revert consumes them newest first.

use crate::collision::RenameEntry;
use crate::config::Options;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const RECORD_FILE_PATTERN: &str = r"^(\d+)\.json$";
const ENTRY_KEY_PATTERN: &str = r"^file_(\d+)$";

/// One persisted run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalRecord {
    entries: Vec<RenameEntry>,
}

impl JournalRecord {
    pub fn new(entries: Vec<RenameEntry>) -> Self {
        Self { entries }
    }

    /// Renames in execution order
    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a record file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let raw: BTreeMap<String, RenameEntry> =
            serde_json::from_reader(reader).map_err(|e| Error::Journal {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let key_pattern = Regex::new(ENTRY_KEY_PATTERN)?;
        let mut indexed = Vec::with_capacity(raw.len());
        for (key, entry) in raw {
            let index = key_pattern
                .captures(&key)
                .and_then(|c| c[1].parse::<u64>().ok())
                .ok_or_else(|| Error::Journal {
                    path: path.to_path_buf(),
                    message: format!("unexpected key '{}'", key),
                })?;
            indexed.push((index, entry));
        }
        indexed.sort_by_key(|(index, _)| *index);

        Ok(Self {
            entries: indexed.into_iter().map(|(_, entry)| entry).collect(),
        })
    }

    fn to_map(&self) -> BTreeMap<String, &RenameEntry> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (format!("file_{}", index), entry))
            .collect()
    }
}

/// A record file found in the history directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFile {
    /// Run number taken from the file name
    pub number: u64,
    pub path: PathBuf,
}

/// Run-history area of one processed directory
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(directory: &Path) -> Self {
        Self {
            dir: Options::history_dir(directory),
        }
    }

    /// Path of the hidden history directory
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Record files, oldest run first
    pub fn records(&self) -> Result<Vec<RecordFile>> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let pattern = Regex::new(RECORD_FILE_PATTERN)?;
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let number = name
                .to_str()
                .and_then(|n| pattern.captures(n))
                .and_then(|c| c[1].parse::<u64>().ok());

            match number {
                Some(number) if entry.path().is_file() => records.push(RecordFile {
                    number,
                    path: entry.path(),
                }),
                _ => {
                    warn!(path = ?entry.path(), "Ignoring unexpected entry in history directory");
                }
            }
        }

        records.sort_by_key(|r| r.number);
        Ok(records)
    }

    /// Number the next record will get
    pub fn next_number(&self) -> Result<u64> {
        Ok(self.records()?.last().map_or(1, |r| r.number + 1))
    }

    /// Persist the renames of one run
    ///
    /// Does nothing for an empty run. The record is written to a temporary
    /// file first and renamed into place, so a record is either complete or
    /// absent.
    pub fn write(&self, entries: &[RenameEntry]) -> Result<Option<PathBuf>> {
        if entries.is_empty() {
            debug!("Nothing renamed, no journal record written");
            return Ok(None);
        }

        fs::create_dir_all(&self.dir)?;

        let number = self.next_number()?;
        let path = self.dir.join(format!("{}.json", number));
        let temp_path = self.dir.join(format!("{}.json.tmp", number));

        let record = JournalRecord::new(entries.to_vec());
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &record.to_map())?;
            writer.flush()?;
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!(record = ?path, entries = entries.len(), "Wrote journal record");
        Ok(Some(path))
    }
}
