//! Photo metadata module
//!
//! Reads what the planner needs from a photo:
//! - capture time (EXIF, or the file modification time as fallback)
//! - a sub-second ordering hint
//! - GPS position as degree/minute/second values

pub mod exif;

pub use exif::ExifReader;

use crate::error::{Error, Result};
use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Raw metadata read from one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMetadata {
    /// Capture date and time, if the file carries one
    pub taken: Option<NaiveDateTime>,
    /// Sub-second part of the capture time
    pub subsec_nanos: Option<u32>,
    /// GPS position
    pub gps: Option<GpsPosition>,
}

/// Source of photo metadata
///
/// `read` fails only when the file cannot be read at all; a file without
/// metadata yields `PhotoMetadata::default()`.
pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<PhotoMetadata>;
}

/// One GPS axis in degrees, minutes and seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsCoordinate {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    /// Hemisphere reference: `N`, `S`, `E` or `W`
    pub reference: char,
}

impl GpsCoordinate {
    /// Decimal degrees, negative for the southern and western hemispheres
    pub fn to_decimal(&self) -> f64 {
        let value = self.degrees + self.minutes / 60.0 + self.seconds / 3600.0;
        match self.reference {
            'S' | 'W' => -value,
            _ => value,
        }
    }
}

/// Latitude and longitude as stored in EXIF
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPosition {
    pub latitude: GpsCoordinate,
    pub longitude: GpsCoordinate,
}

impl GpsPosition {
    /// `(latitude, longitude)` in decimal degrees
    pub fn to_decimal(&self) -> (f64, f64) {
        (self.latitude.to_decimal(), self.longitude.to_decimal())
    }
}

/// Source of the capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Extracted from EXIF metadata
    Exif,
    /// From file system modification time
    FileSystem,
}

/// Capture instant used to order photos that share a name
///
/// Ordered by `taken`, then by `subsec_nanos`. The sub-second part is only
/// an ordering hint: it comes from EXIF when present, otherwise from the
/// modification time of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureInstant {
    pub taken: NaiveDateTime,
    pub subsec_nanos: u32,
}

/// Resolved capture time of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    pub instant: CaptureInstant,
    pub source: TimeSource,
}

/// Work out the capture time of `path` from its metadata
///
/// Without an EXIF date the modification time is used only when
/// `fallback_to_file_time` is set; otherwise the file has no usable time.
pub fn resolve_capture_time(
    path: &Path,
    metadata: &PhotoMetadata,
    fallback_to_file_time: bool,
) -> Result<CaptureTime> {
    let modified = fs::metadata(path).map(|m| FileTime::from_last_modification_time(&m));

    if let Some(taken) = metadata.taken {
        let subsec_nanos = metadata
            .subsec_nanos
            .or_else(|| modified.as_ref().ok().map(|m| m.nanoseconds()))
            .unwrap_or(0);
        return Ok(CaptureTime {
            instant: CaptureInstant { taken, subsec_nanos },
            source: TimeSource::Exif,
        });
    }

    if !fallback_to_file_time {
        debug!(?path, "No EXIF capture time and file time fallback disabled");
        return Err(Error::MissingCaptureTime {
            path: path.to_path_buf(),
        });
    }

    let modified = modified?;
    let datetime = DateTime::from_timestamp(modified.unix_seconds(), modified.nanoseconds())
        .ok_or_else(|| Error::MissingCaptureTime {
            path: path.to_path_buf(),
        })?;
    let local = datetime.with_timezone(&Local).naive_local();

    warn!(?path, "Using file system modification time as fallback");

    Ok(CaptureTime {
        instant: CaptureInstant {
            taken: local.with_nanosecond(0).unwrap_or(local),
            subsec_nanos: modified.nanoseconds(),
        },
        source: TimeSource::FileSystem,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 5, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_gps_to_decimal() {
        let north = GpsCoordinate {
            degrees: 48.0,
            minutes: 51.0,
            seconds: 29.88,
            reference: 'N',
        };
        assert!((north.to_decimal() - 48.8583).abs() < 1e-4);

        let west = GpsCoordinate {
            degrees: 73.0,
            minutes: 59.0,
            seconds: 8.5,
            reference: 'W',
        };
        assert!((west.to_decimal() + 73.985_694).abs() < 1e-4);

        let south = GpsCoordinate {
            degrees: 33.0,
            minutes: 30.0,
            seconds: 0.0,
            reference: 'S',
        };
        assert_eq!(south.to_decimal(), -33.5);
    }

    #[test]
    fn test_capture_instant_ordering() {
        let a = CaptureInstant {
            taken: at(14, 30, 5),
            subsec_nanos: 900,
        };
        let b = CaptureInstant {
            taken: at(14, 30, 42),
            subsec_nanos: 0,
        };
        let c = CaptureInstant {
            taken: at(14, 30, 42),
            subsec_nanos: 10,
        };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_exif_time_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"x").unwrap();

        let metadata = PhotoMetadata {
            taken: Some(at(14, 30, 5)),
            subsec_nanos: Some(250_000_000),
            gps: None,
        };
        let time = resolve_capture_time(&path, &metadata, false).unwrap();
        assert_eq!(time.source, TimeSource::Exif);
        assert_eq!(time.instant.taken, at(14, 30, 5));
        assert_eq!(time.instant.subsec_nanos, 250_000_000);
    }

    #[test]
    fn test_missing_time_without_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"x").unwrap();

        let err = resolve_capture_time(&path, &PhotoMetadata::default(), false).unwrap_err();
        assert!(matches!(err, Error::MissingCaptureTime { .. }));
    }

    #[test]
    fn test_file_time_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"x").unwrap();
        let mtime = FileTime::from_unix_time(1_620_000_000, 123_000);
        filetime::set_file_mtime(&path, mtime).unwrap();

        let time = resolve_capture_time(&path, &PhotoMetadata::default(), true).unwrap();
        assert_eq!(time.source, TimeSource::FileSystem);
        assert_eq!(time.instant.taken.nanosecond(), 0);

        let expected = DateTime::from_timestamp(1_620_000_000, 0)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(time.instant.taken, expected);
    }
}
