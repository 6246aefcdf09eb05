//! Photo Sorter - rename photos after the moment they were taken
//!
//! This library renames the JPEG photos of a directory to canonical,
//! chronologically sortable names with support for:
//! - EXIF capture time, with the file modification time as fallback
//! - Country and town from the GPS position (reverse geocoding)
//! - Year / month subdirectories
//! - Deterministic collision handling for photos taken the same minute
//! - A per-directory journal so every run can be undone
//! - Parallel metadata reads with Rayon
//! - Interactive terminal front-end

pub mod busy;
pub mod cli;
pub mod collision;
pub mod config;
pub mod error;
pub mod geocode;
pub mod journal;
pub mod metadata;
pub mod naming;
pub mod process;
pub mod revert;
pub mod tui;

pub use busy::{DirectoryGuard, DirectoryLocks};
pub use cli::Cli;
pub use collision::{Proposal, RenameEntry, resolve};
pub use config::{CollisionPolicy, ConfigError, Options, SortPolicy};
pub use error::{Error, Result};
pub use geocode::{Address, CachedGeocoder, Geocoder, Location, NominatimGeocoder};
pub use journal::{Journal, JournalRecord};
pub use metadata::{CaptureInstant, ExifReader, GpsPosition, MetadataReader, PhotoMetadata};
pub use naming::{NameBuilder, NamePrecision, ProposedName};
pub use process::{
    Plan, ProcessReport, ProcessingStats, Processor, SkipReason, SkippedFile, process_directory,
};
pub use revert::{RevertOutcome, RevertReport, revert_directory};
pub use tui::{TuiApp, should_run_interactive};
