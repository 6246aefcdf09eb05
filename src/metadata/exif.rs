//! EXIF metadata extraction for images

use crate::error::{Error, Result};
use crate::metadata::{GpsCoordinate, GpsPosition, MetadataReader, PhotoMetadata};
use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, trace};

/// EXIF tags to try for date extraction, in priority order
const DATE_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal,  // When the original image was taken
    Tag::DateTimeDigitized, // When the image was digitized
    Tag::DateTime,          // File modification date/time
];

/// Sub-second tags matching `DATE_TAGS`
const SUBSEC_TAGS: &[Tag] = &[Tag::SubSecTimeOriginal, Tag::SubSecTimeDigitized, Tag::SubSecTime];

/// Metadata reader backed by the EXIF block of the file
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReader;

impl MetadataReader for ExifReader {
    fn read(&self, path: &Path) -> Result<PhotoMetadata> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let exif = match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => {
                debug!(?path, "No EXIF block found");
                return Ok(PhotoMetadata::default());
            }
            Err(exif::Error::Io(e)) => return Err(Error::Io(e)),
            Err(e) => {
                return Err(Error::ExifRead {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };

        let mut metadata = PhotoMetadata::default();

        for (tag, subsec_tag) in DATE_TAGS.iter().zip(SUBSEC_TAGS) {
            let Some(field) = exif.get_field(*tag, In::PRIMARY) else {
                continue;
            };
            if let Some(datetime) = parse_exif_datetime(&field.display_value().to_string()) {
                trace!(?path, ?tag, "Found EXIF date");
                metadata.taken = Some(datetime);
                metadata.subsec_nanos = exif
                    .get_field(*subsec_tag, In::PRIMARY)
                    .and_then(|f| parse_subsec(&f.display_value().to_string()));
                break;
            }
        }

        metadata.gps = read_gps(&exif);
        Ok(metadata)
    }
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
pub(crate) fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    // kamadak-exif renders DateTime values as "YYYY-MM-DD HH:MM:SS"
    let s = s.trim().trim_matches('"');

    let formats = [
        "%Y:%m:%d %H:%M:%S",
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

/// Parse an EXIF SubSecTime value ("042", "5") into nanoseconds
pub(crate) fn parse_subsec(s: &str) -> Option<u32> {
    let digits: String = s
        .trim()
        .trim_matches('"')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .take(9)
        .collect();
    if digits.is_empty() {
        return None;
    }

    let scale = 10u32.pow(9 - digits.len() as u32);
    digits.parse::<u32>().ok().map(|v| v * scale)
}

fn read_gps(exif: &Exif) -> Option<GpsPosition> {
    let latitude = read_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef)?;
    let longitude = read_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef)?;
    Some(GpsPosition { latitude, longitude })
}

fn read_coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag) -> Option<GpsCoordinate> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let reference = exif
        .get_field(ref_tag, In::PRIMARY)?
        .display_value()
        .to_string()
        .trim_matches('"')
        .chars()
        .find(|c| c.is_ascii_alphabetic())?;

    match &field.value {
        Value::Rational(values) if values.len() >= 3 => Some(GpsCoordinate {
            degrees: values[0].to_f64(),
            minutes: values[1].to_f64(),
            seconds: values[2].to_f64(),
            reference: reference.to_ascii_uppercase(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use exif::experimental::Writer;
    use exif::{Field, Rational};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn ascii(tag: Tag, text: &str) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        }
    }

    fn dms(tag: Tag, degrees: u32, minutes: u32, centiseconds: u32) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![
                Rational { num: degrees, denom: 1 },
                Rational { num: minutes, denom: 1 },
                Rational { num: centiseconds, denom: 100 },
            ]),
        }
    }

    /// Minimal JPEG whose APP1 segment carries `fields`
    fn write_jpeg(dir: &tempfile::TempDir, name: &str, fields: &[Field]) -> std::path::PathBuf {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();
        let tiff = tiff.into_inner();

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        let length = (tiff.len() + 8) as u16;
        jpeg.extend_from_slice(&length.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);

        let path = dir.path().join(name);
        std::fs::write(&path, jpeg).unwrap();
        path
    }

    #[test]
    fn test_parse_exif_datetime() {
        // Standard EXIF format
        let dt = parse_exif_datetime("2021:05:03 14:30:05").unwrap();
        assert_eq!(dt.year(), 2021);
        assert_eq!(dt.month(), 5);
        assert_eq!(dt.day(), 3);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 5);

        // As rendered by display_value
        let dt = parse_exif_datetime("2021-05-03 14:30:05").unwrap();
        assert_eq!(dt.minute(), 30);

        // With quotes
        let dt = parse_exif_datetime("\"2021:05:03 14:30:05\"").unwrap();
        assert_eq!(dt.year(), 2021);

        // Blank camera clocks write zeros
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("invalid").is_none());
    }

    #[test]
    fn test_parse_subsec() {
        assert_eq!(parse_subsec("5"), Some(500_000_000));
        assert_eq!(parse_subsec("042"), Some(42_000_000));
        assert_eq!(parse_subsec("\"123456789\""), Some(123_456_789));
        assert_eq!(parse_subsec("1234567891"), Some(123_456_789));
        assert_eq!(parse_subsec(""), None);
        assert_eq!(parse_subsec("  "), None);
    }

    #[test]
    fn test_file_without_exif_yields_empty_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        // SOI + EOI: a JPEG with no APP1 segment
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

        let metadata = ExifReader.read(&path).unwrap();
        assert!(metadata.taken.is_none());
        assert!(metadata.gps.is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(ExifReader.read(&dir.path().join("gone.jpg")).is_err());
    }

    #[test]
    fn test_original_time_wins_over_modification_time() {
        let dir = tempdir().unwrap();
        let path = write_jpeg(
            &dir,
            "a.jpg",
            &[
                ascii(Tag::DateTime, "2022:01:01 09:00:00"),
                ascii(Tag::DateTimeOriginal, "2021:05:03 14:30:05"),
                ascii(Tag::SubSecTimeOriginal, "042"),
                ascii(Tag::SubSecTime, "9"),
            ],
        );

        let metadata = ExifReader.read(&path).unwrap();
        let taken = metadata.taken.unwrap();
        assert_eq!(taken, parse_exif_datetime("2021:05:03 14:30:05").unwrap());
        assert_eq!(metadata.subsec_nanos, Some(42_000_000));
        assert!(metadata.gps.is_none());
    }

    #[test]
    fn test_digitized_time_used_without_original() {
        let dir = tempdir().unwrap();
        let path = write_jpeg(
            &dir,
            "b.jpg",
            &[
                ascii(Tag::DateTime, "2022:01:01 09:00:00"),
                ascii(Tag::DateTimeDigitized, "2020:02:29 23:59:58"),
            ],
        );

        let metadata = ExifReader.read(&path).unwrap();
        assert_eq!(metadata.taken, parse_exif_datetime("2020:02:29 23:59:58"));
        assert_eq!(metadata.subsec_nanos, None);
    }

    #[test]
    fn test_gps_south_and_west() {
        let dir = tempdir().unwrap();
        let path = write_jpeg(
            &dir,
            "c.jpg",
            &[
                ascii(Tag::DateTimeOriginal, "2021:05:03 14:30:05"),
                ascii(Tag::GPSLatitudeRef, "S"),
                dms(Tag::GPSLatitude, 33, 51, 5400),
                ascii(Tag::GPSLongitudeRef, "W"),
                dms(Tag::GPSLongitude, 70, 39, 3600),
            ],
        );

        let gps = ExifReader.read(&path).unwrap().gps.unwrap();
        assert_eq!(gps.latitude.reference, 'S');
        assert_eq!(gps.longitude.reference, 'W');

        let (latitude, longitude) = gps.to_decimal();
        assert!((latitude + 33.865).abs() < 1e-9);
        assert!((longitude + 70.66).abs() < 1e-9);
    }

    #[test]
    fn test_gps_without_reference_is_ignored() {
        let dir = tempdir().unwrap();
        let path = write_jpeg(
            &dir,
            "d.jpg",
            &[
                dms(Tag::GPSLatitude, 48, 51, 2988),
                ascii(Tag::GPSLongitudeRef, "E"),
                dms(Tag::GPSLongitude, 2, 17, 400),
            ],
        );

        let metadata = ExifReader.read(&path).unwrap();
        assert!(metadata.gps.is_none());
        assert!(metadata.taken.is_none());
    }
}
