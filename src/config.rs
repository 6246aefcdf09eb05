//! Configuration types for the photo sorter

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the hidden run-history directory inside a processed directory
pub const HISTORY_DIR_NAME: &str = ".photosorter";

/// Extensions (lowercase) picked up by the planner
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Extension given to every renamed file
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Subdirectory policy for renamed files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortPolicy {
    /// Keep files next to their source
    #[default]
    None,
    /// `YYYY/`
    Year,
    /// `YYYY-MM/`
    Month,
    /// `YYYY/MM/`
    YearAndMonth,
}

impl SortPolicy {
    /// Combine the independent `--year` and `--month` switches
    pub fn from_flags(year: bool, month: bool) -> Self {
        match (year, month) {
            (false, false) => SortPolicy::None,
            (true, false) => SortPolicy::Year,
            (false, true) => SortPolicy::Month,
            (true, true) => SortPolicy::YearAndMonth,
        }
    }
}

/// How files that map to the same name are told apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Earliest photo keeps the name, later ones get `-1`, `-2`, ...
    #[default]
    Counter,
    /// Later photos are named down to the second first, counters only if
    /// the seconds collide too
    Seconds,
}

/// Options for one process run
///
/// Built once before the run starts; nothing in the core mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Subdirectory policy
    pub sort: SortPolicy,

    /// Look up country and town from GPS coordinates
    pub use_gps: bool,

    /// Free-form suffix appended to every name
    pub suffix: String,

    /// Use the file modification time when EXIF has no capture time
    pub fallback_to_file_time: bool,

    /// Collision policy applied to the whole batch
    pub collision: CollisionPolicy,

    /// Number of threads for metadata reads (0 = auto)
    pub threads: usize,

    /// Reverse geocoding endpoint (Nominatim compatible)
    pub geocoder_url: String,

    /// Timeout for one geocoding request in seconds
    pub geocoder_timeout_secs: u64,

    /// User agent sent to the geocoding service
    pub user_agent: String,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sort: SortPolicy::default(),
            use_gps: false,
            suffix: String::new(),
            fallback_to_file_time: false,
            collision: CollisionPolicy::default(),
            threads: 0,
            geocoder_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            geocoder_timeout_secs: 10,
            user_agent: format!("photo-sorter/{}", env!("CARGO_PKG_VERSION")),
            verbose: false,
        }
    }
}

impl Options {
    /// Check if a file extension is one the planner renames
    pub fn is_supported(ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        IMAGE_EXTENSIONS.iter().any(|e| *e == ext_lower)
    }

    /// Hidden run-history directory for a processed directory
    pub fn history_dir(directory: &Path) -> PathBuf {
        directory.join(HISTORY_DIR_NAME)
    }

    /// Load options from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let options: Options = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(options)
    }

    /// Save options to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Photo Sorter Configuration File
# This file uses TOML format (https://toml.io)

# Subdirectory policy: "none", "year", "month" or "year-and-month"
# - none: renamed files stay next to the original
# - year: YYYY/
# - month: YYYY-MM/
# - year-and-month: YYYY/MM/
sort = "none"

# Look up country and town from the GPS position stored in the photo
use_gps = false

# Text appended to every new name, e.g. "Holidays"
suffix = ""

# Use the file modification time when the photo has no capture date
fallback_to_file_time = false

# How photos taken in the same minute are told apart:
# - counter: 2021-05-03-14H30.jpg, 2021-05-03-14H30-1.jpg, ...
# - seconds: 2021-05-03-14H30.jpg, 2021-05-03-14H30m42.jpg, ...
collision = "counter"

# Number of threads for reading metadata (0 = auto-detect)
threads = 0

# Reverse geocoding service (Nominatim compatible)
geocoder_url = "https://nominatim.openstreetmap.org/reverse"
geocoder_timeout_secs = 10

# Verbose output
verbose = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError { source: toml::ser::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
