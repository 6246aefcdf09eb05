//! Rename planning and execution
//!
//! Handles the core logic of:
//! - Listing the photos of a directory
//! - Reading capture time and location
//! - Building canonical names and resolving collisions
//! - Renaming and journaling the batch

use crate::collision::{Proposal, RenameEntry, resolve};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::geocode::{CachedGeocoder, Geocoder, Location, NominatimGeocoder, locate};
use crate::journal::Journal;
use crate::metadata::{ExifReader, MetadataReader, resolve_capture_time};
use crate::naming::{NameBuilder, NamePrecision};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, error, info, span, warn};
use walkdir::WalkDir;

/// Why a file was left out of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// File or its metadata could not be read
    Unreadable(String),
    /// No EXIF capture time and file time fallback disabled
    MissingCaptureTime,
    /// Destination is held by a file outside the batch
    DestinationExists,
    /// Source disappeared before it could be renamed
    SourceMissing,
    /// The rename itself failed
    RenameFailed(String),
    /// Destinations of several files depend on each other in a loop
    Cycle,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Unreadable(message) => write!(f, "unreadable: {}", message),
            SkipReason::MissingCaptureTime => write!(f, "no capture time"),
            SkipReason::DestinationExists => write!(f, "destination already exists"),
            SkipReason::SourceMissing => write!(f, "source file disappeared"),
            SkipReason::RenameFailed(message) => write!(f, "rename failed: {}", message),
            SkipReason::Cycle => write!(f, "circular rename"),
        }
    }
}

/// A file left untouched, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub reason: SkipReason,
}

impl SkippedFile {
    fn new(source: &Path, destination: Option<&Path>, reason: SkipReason) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.map(Path::to_path_buf),
            reason,
        }
    }
}

/// Planned renames of one directory, before anything touches the disk
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Directory the plan was made for (canonical)
    pub directory: PathBuf,
    /// Renames with pairwise distinct destinations, no no-ops
    pub entries: Vec<RenameEntry>,
    /// Files left out while planning
    pub skipped: Vec<SkippedFile>,
    /// Files already carrying their canonical name
    pub unchanged: Vec<PathBuf>,
}

/// Outcome of a process run
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    pub directory: PathBuf,
    /// Renames actually performed, in execution order
    pub renamed: Vec<RenameEntry>,
    pub skipped: Vec<SkippedFile>,
    pub unchanged: Vec<PathBuf>,
    /// Journal record written for the run
    pub journal: Option<PathBuf>,
    pub stats: ProcessingStats,
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub total_files: AtomicUsize,
    pub renamed: AtomicUsize,
    pub unchanged: AtomicUsize,
    pub skipped: AtomicUsize,
    pub failed: AtomicUsize,
}

impl Clone for ProcessingStats {
    fn clone(&self) -> Self {
        Self {
            total_files: AtomicUsize::new(self.total_files.load(Ordering::Relaxed)),
            renamed: AtomicUsize::new(self.renamed.load(Ordering::Relaxed)),
            unchanged: AtomicUsize::new(self.unchanged.load(Ordering::Relaxed)),
            skipped: AtomicUsize::new(self.skipped.load(Ordering::Relaxed)),
            failed: AtomicUsize::new(self.failed.load(Ordering::Relaxed)),
        }
    }
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Renamed: {}, Unchanged: {}, Skipped: {}, Failed: {}",
            self.total_files.load(Ordering::Relaxed),
            self.renamed.load(Ordering::Relaxed),
            self.unchanged.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        )
    }
}

/// Renames the photos of a directory after their capture time
pub struct Processor {
    options: Options,
    reader: Box<dyn MetadataReader>,
    geocoder: Option<Box<dyn Geocoder>>,
    stats: Arc<ProcessingStats>,
}

impl Processor {
    /// Create a processor reading EXIF and, with `use_gps`, querying Nominatim
    pub fn new(options: Options) -> Result<Self> {
        let geocoder: Option<Box<dyn Geocoder>> = if options.use_gps {
            Some(Box::new(CachedGeocoder::new(NominatimGeocoder::new(&options)?)))
        } else {
            None
        };
        Ok(Self::with_collaborators(options, Box::new(ExifReader), geocoder))
    }

    /// Create a processor with explicit metadata and geocoding sources
    pub fn with_collaborators(
        options: Options,
        reader: Box<dyn MetadataReader>,
        geocoder: Option<Box<dyn Geocoder>>,
    ) -> Self {
        if options.threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(options.threads)
                .build_global()
                .ok(); // Ignore if already initialized
        }

        Self {
            options,
            reader,
            geocoder,
            stats: Arc::new(ProcessingStats::new()),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Get processing statistics reference
    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Get a clone of the internal stats Arc for shared access
    pub fn stats_arc(&self) -> Arc<ProcessingStats> {
        self.stats.clone()
    }

    /// Plan, rename and journal one directory
    pub fn run(&self, directory: &Path) -> Result<ProcessReport> {
        let _span = span!(Level::INFO, "process_run", ?directory).entered();

        let plan = self.plan(directory)?;
        let (renamed, commit_skipped) = self.commit(&plan.entries);

        let journal = match Journal::new(&plan.directory).write(&renamed) {
            Ok(path) => path,
            Err(e) => {
                error!(
                    error = %e,
                    renamed = renamed.len(),
                    "Failed to write journal record, this run cannot be reverted"
                );
                return Err(e);
            }
        };

        let mut skipped = plan.skipped;
        skipped.extend(commit_skipped);

        info!("{}", self.stats.summary());

        Ok(ProcessReport {
            directory: plan.directory,
            renamed,
            skipped,
            unchanged: plan.unchanged,
            journal,
            stats: (*self.stats).clone(),
        })
    }

    /// Photos directly inside `directory`, sorted by path
    pub fn collect_files(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "Cannot access directory entry, skipping");
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_file()
                && let Some(ext) = path.extension().and_then(|e| e.to_str())
                && Options::is_supported(ext)
            {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Work out the renames for `directory` without touching any file
    pub fn plan(&self, directory: &Path) -> Result<Plan> {
        let directory = canonical_directory(directory)?;

        info!(?directory, "Scanning directory...");
        let files = self.collect_files(&directory)?;
        info!(count = files.len(), "Found photos");
        self.stats.total_files.store(files.len(), Ordering::Relaxed);

        let builder = NameBuilder::new(&self.options.suffix, self.options.sort);

        // Order of `files` is kept by the parallel collect
        let outcomes: Vec<std::result::Result<Proposal, SkippedFile>> = files
            .par_iter()
            .map(|path| self.propose(path, &directory, &builder))
            .collect();

        let mut proposals = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(proposal) => proposals.push(proposal),
                Err(skip) => {
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    skipped.push(skip);
                }
            }
        }

        let mut entries = Vec::new();
        let mut unchanged = Vec::new();
        for entry in resolve(proposals, self.options.collision) {
            if entry.is_noop() {
                debug!(path = ?entry.old_path, "Already named, leaving as is");
                self.stats.unchanged.fetch_add(1, Ordering::Relaxed);
                unchanged.push(entry.old_path);
            } else {
                entries.push(entry);
            }
        }

        Ok(Plan {
            directory,
            entries,
            skipped,
            unchanged,
        })
    }

    /// Proposed destinations for one file
    fn propose(
        &self,
        path: &Path,
        directory: &Path,
        builder: &NameBuilder,
    ) -> std::result::Result<Proposal, SkippedFile> {
        let _file_span = span!(Level::DEBUG, "propose", ?path).entered();

        let metadata = self.reader.read(path).map_err(|e| {
            warn!(?path, error = %e, "Cannot read photo, skipping");
            SkippedFile::new(path, None, SkipReason::Unreadable(e.to_string()))
        })?;

        let time = match resolve_capture_time(path, &metadata, self.options.fallback_to_file_time) {
            Ok(time) => time,
            Err(Error::MissingCaptureTime { .. }) => {
                warn!(?path, "No capture time, skipping");
                return Err(SkippedFile::new(path, None, SkipReason::MissingCaptureTime));
            }
            Err(e) => {
                warn!(?path, error = %e, "Cannot determine capture time, skipping");
                return Err(SkippedFile::new(
                    path,
                    None,
                    SkipReason::Unreadable(e.to_string()),
                ));
            }
        };

        let location = match (&self.geocoder, &metadata.gps) {
            (Some(geocoder), Some(position)) if self.options.use_gps => {
                locate(geocoder.as_ref(), position)
            }
            _ => Location::default(),
        };

        let taken = &time.instant.taken;
        let minute = builder.build(taken, &location, NamePrecision::Minute);
        let second = builder.build(taken, &location, NamePrecision::Second);

        debug!(
            ?path,
            time_source = ?time.source,
            timestamp = %taken,
            proposed = %minute.file_name,
            "Proposed name"
        );

        Ok(Proposal {
            source: path.to_path_buf(),
            instant: time.instant,
            destination: minute.destination(directory),
            seconds_destination: second.destination(directory),
        })
    }

    /// Execute planned renames
    ///
    /// Never overwrites: an entry whose destination is held by a file outside
    /// the batch is skipped. An entry whose destination is the source of
    /// another pending entry waits until that one has moved.
    pub fn commit(&self, entries: &[RenameEntry]) -> (Vec<RenameEntry>, Vec<SkippedFile>) {
        let mut pending: Vec<RenameEntry> = entries.to_vec();
        let mut renamed = Vec::with_capacity(pending.len());
        let mut skipped = Vec::new();

        while !pending.is_empty() {
            let sources: HashSet<PathBuf> = pending.iter().map(|e| e.old_path.clone()).collect();
            let mut deferred = Vec::new();
            let mut progressed = false;

            for entry in pending {
                if path_exists(&entry.new_path) {
                    if sources.contains(&entry.new_path) {
                        deferred.push(entry);
                    } else {
                        error!(
                            source = ?entry.old_path,
                            destination = ?entry.new_path,
                            "Destination already exists, skipping"
                        );
                        self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                        skipped.push(SkippedFile::new(
                            &entry.old_path,
                            Some(&entry.new_path),
                            SkipReason::DestinationExists,
                        ));
                    }
                    continue;
                }

                if !path_exists(&entry.old_path) {
                    warn!(source = ?entry.old_path, "Source vanished before rename, skipping");
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    skipped.push(SkippedFile::new(
                        &entry.old_path,
                        Some(&entry.new_path),
                        SkipReason::SourceMissing,
                    ));
                    continue;
                }

                match rename_into(&entry.old_path, &entry.new_path) {
                    Ok(()) => {
                        info!(source = ?entry.old_path, destination = ?entry.new_path, "Renamed");
                        self.stats.renamed.fetch_add(1, Ordering::Relaxed);
                        progressed = true;
                        renamed.push(entry);
                    }
                    Err(e) => {
                        error!(
                            source = ?entry.old_path,
                            destination = ?entry.new_path,
                            error = %e,
                            "Rename failed"
                        );
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        skipped.push(SkippedFile::new(
                            &entry.old_path,
                            Some(&entry.new_path),
                            SkipReason::RenameFailed(e.to_string()),
                        ));
                    }
                }
            }

            if !progressed && !deferred.is_empty() {
                for entry in deferred {
                    error!(
                        source = ?entry.old_path,
                        destination = ?entry.new_path,
                        "Circular rename, skipping"
                    );
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    skipped.push(SkippedFile::new(
                        &entry.old_path,
                        Some(&entry.new_path),
                        SkipReason::Cycle,
                    ));
                }
                break;
            }
            pending = deferred;
        }

        (renamed, skipped)
    }
}

/// Process `directory` with the production EXIF reader and geocoder
pub fn process_directory(directory: &Path, options: Options) -> Result<ProcessReport> {
    Processor::new(options)?.run(directory)
}

/// Absolute form of `directory`, which must be an existing directory
pub(crate) fn canonical_directory(directory: &Path) -> Result<PathBuf> {
    let canonical = directory.canonicalize()?;
    if !canonical.is_dir() {
        return Err(Error::NotADirectory { path: canonical });
    }
    Ok(canonical)
}

/// Exists on disk, dangling symlinks included
fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Rename, creating the destination directory first
fn rename_into(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(source, dest)?;
    Ok(())
}
