//! Error types for the photo sorter

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo sorter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo sorter
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read EXIF data from {}: {message}", path.display())]
    ExifRead { path: PathBuf, message: String },

    #[error("No capture time available for {}", path.display())]
    MissingCaptureTime { path: PathBuf },

    #[error("Reverse geocoding failed: {0}")]
    Geocode(String),

    #[error("Invalid journal record {}: {message}", path.display())]
    Journal { path: PathBuf, message: String },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Directory is already being processed: {}", path.display())]
    Busy { path: PathBuf },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
