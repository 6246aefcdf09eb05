//! Canonical file names
//!
//! A name looks like `2021-05-03-14H30[mSS][-Country][-Town][-suffix].jpg`;
//! the subdirectory it lands in follows the `SortPolicy`.

use crate::config::{OUTPUT_EXTENSION, SortPolicy};
use crate::geocode::Location;
use chrono::{Datelike, NaiveDateTime, Timelike};
use deunicode::deunicode_with_tofu;
use std::path::{Path, PathBuf};

/// Characters dropped from place names
const STRIPPED_CHARS: &[char] = &['-', ':', ',', '.', ' ', '/', '\\'];

/// Time resolution of a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePrecision {
    /// `14H30`
    Minute,
    /// `14H30m05`
    Second,
}

/// File name and subdirectory derived for one photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedName {
    pub file_name: String,
    /// Relative to the directory of the source file; empty for `SortPolicy::None`
    pub subdirectory: PathBuf,
}

impl ProposedName {
    /// Full destination path for a file living in `directory`
    pub fn destination(&self, directory: &Path) -> PathBuf {
        directory.join(&self.subdirectory).join(&self.file_name)
    }
}

/// Builds canonical names for one run
#[derive(Debug, Clone)]
pub struct NameBuilder {
    suffix: Option<String>,
    sort: SortPolicy,
}

impl NameBuilder {
    pub fn new(suffix: &str, sort: SortPolicy) -> Self {
        let suffix: String = suffix
            .trim()
            .chars()
            .filter(|c| !matches!(c, '/' | '\\') && !c.is_control())
            .collect();
        Self {
            suffix: (!suffix.is_empty()).then_some(suffix),
            sort,
        }
    }

    /// Name and subdirectory for a photo taken at `timestamp`
    pub fn build(
        &self,
        timestamp: &NaiveDateTime,
        location: &Location,
        precision: NamePrecision,
    ) -> ProposedName {
        let mut name = format!(
            "{:04}-{:02}-{:02}-{:02}H{:02}",
            timestamp.year(),
            timestamp.month(),
            timestamp.day(),
            timestamp.hour(),
            timestamp.minute()
        );
        if precision == NamePrecision::Second {
            name.push_str(&format!("m{:02}", timestamp.second()));
        }

        let places = [&location.country, &location.town];
        for place in places.into_iter().flatten() {
            if let Some(clean) = sanitize_place(place) {
                name.push('-');
                name.push_str(&clean);
            }
        }

        if let Some(suffix) = &self.suffix {
            name.push('-');
            name.push_str(suffix);
        }

        name.push('.');
        name.push_str(OUTPUT_EXTENSION);

        ProposedName {
            file_name: name,
            subdirectory: subdirectory(timestamp, self.sort),
        }
    }
}

/// Subdirectory for a timestamp under a sort policy
pub fn subdirectory(timestamp: &NaiveDateTime, sort: SortPolicy) -> PathBuf {
    let year = format!("{:04}", timestamp.year());
    let month = format!("{:02}", timestamp.month());

    match sort {
        SortPolicy::None => PathBuf::new(),
        SortPolicy::Year => PathBuf::from(year),
        SortPolicy::Month => PathBuf::from(format!("{}-{}", year, month)),
        SortPolicy::YearAndMonth => PathBuf::from(year).join(month),
    }
}

/// Reduce a place name to a plain ASCII token
///
/// Only the first of several `/`-separated names is kept, so
/// "Ivory Coast / Côte d'Ivoire" becomes "IvoryCoast".
pub fn sanitize_place(name: &str) -> Option<String> {
    let first = name.split('/').next().unwrap_or_default();
    let ascii = deunicode_with_tofu(first, "");
    let clean: String = ascii
        .chars()
        .filter(|c| c.is_ascii_graphic() && !STRIPPED_CHARS.contains(c))
        .collect();

    (!clean.is_empty()).then_some(clean)
}

/// Insert `-{counter}` before the extension of `file_name`
pub fn with_counter(file_name: &str, counter: usize) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, counter, ext),
        None => format!("{}-{}", stem, counter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_base_name() {
        let builder = NameBuilder::new("", SortPolicy::None);
        let name = builder.build(
            &ts(2021, 5, 3, 14, 30, 5),
            &Location::default(),
            NamePrecision::Minute,
        );
        assert_eq!(name.file_name, "2021-05-03-14H30.jpg");
        assert_eq!(name.subdirectory, PathBuf::new());
    }

    #[test]
    fn test_seconds_precision() {
        let builder = NameBuilder::new("", SortPolicy::None);
        let name = builder.build(
            &ts(2021, 5, 3, 9, 4, 7),
            &Location::default(),
            NamePrecision::Second,
        );
        assert_eq!(name.file_name, "2021-05-03-09H04m07.jpg");
    }

    #[test]
    fn test_location_and_suffix() {
        let builder = NameBuilder::new("Holidays", SortPolicy::None);
        let location = Location::new("Ivory Coast / Côte d'Ivoire", "Grand-Bassam");
        let name = builder.build(&ts(2021, 5, 3, 14, 30, 0), &location, NamePrecision::Minute);
        assert_eq!(
            name.file_name,
            "2021-05-03-14H30-IvoryCoast-GrandBassam-Holidays.jpg"
        );
    }

    #[test]
    fn test_partial_location() {
        let builder = NameBuilder::new("", SortPolicy::None);
        let location = Location {
            country: None,
            town: Some("São Paulo".into()),
        };
        let name = builder.build(&ts(2020, 1, 2, 3, 4, 5), &location, NamePrecision::Minute);
        assert_eq!(name.file_name, "2020-01-02-03H04-SaoPaulo.jpg");
    }

    #[test]
    fn test_sanitize_place() {
        assert_eq!(sanitize_place("Côte d'Ivoire").as_deref(), Some("Coted'Ivoire"));
        assert_eq!(sanitize_place("St. John's, N.L.").as_deref(), Some("StJohn'sNL"));
        assert_eq!(sanitize_place("Zürich").as_deref(), Some("Zurich"));
        assert_eq!(sanitize_place("A:B-C").as_deref(), Some("ABC"));
        assert_eq!(sanitize_place(" - . "), None);
        assert_eq!(sanitize_place(""), None);

        let clean = sanitize_place("Россия / Russia").unwrap();
        assert!(clean.is_ascii());
        assert!(!clean.contains(['-', ':', ',', '.', ' ']));
    }

    #[test]
    fn test_subdirectory_policies() {
        let t = ts(2021, 5, 3, 14, 30, 0);
        assert_eq!(subdirectory(&t, SortPolicy::None), PathBuf::new());
        assert_eq!(subdirectory(&t, SortPolicy::Year), PathBuf::from("2021"));
        assert_eq!(subdirectory(&t, SortPolicy::Month), PathBuf::from("2021-05"));
        assert_eq!(
            subdirectory(&t, SortPolicy::YearAndMonth),
            PathBuf::from("2021").join("05")
        );
    }

    #[test]
    fn test_destination() {
        let builder = NameBuilder::new("", SortPolicy::Month);
        let name = builder.build(
            &ts(2021, 5, 3, 14, 30, 0),
            &Location::default(),
            NamePrecision::Minute,
        );
        assert_eq!(
            name.destination(Path::new("/photos")),
            PathBuf::from("/photos/2021-05/2021-05-03-14H30.jpg")
        );
    }

    #[test]
    fn test_suffix_is_trimmed_and_path_safe() {
        let builder = NameBuilder::new("  a/b  ", SortPolicy::None);
        let name = builder.build(
            &ts(2021, 5, 3, 14, 30, 0),
            &Location::default(),
            NamePrecision::Minute,
        );
        assert_eq!(name.file_name, "2021-05-03-14H30-ab.jpg");

        let builder = NameBuilder::new("   ", SortPolicy::None);
        let name = builder.build(
            &ts(2021, 5, 3, 14, 30, 0),
            &Location::default(),
            NamePrecision::Minute,
        );
        assert_eq!(name.file_name, "2021-05-03-14H30.jpg");
    }

    #[test]
    fn test_with_counter() {
        assert_eq!(with_counter("2021-05-03-14H30.jpg", 1), "2021-05-03-14H30-1.jpg");
        assert_eq!(
            with_counter("2021-05-03-14H30-Paris.jpg", 12),
            "2021-05-03-14H30-Paris-12.jpg"
        );
        assert_eq!(with_counter("noext", 2), "noext-2");
    }

    #[test]
    fn test_name_pattern_holds() {
        let builder = NameBuilder::new("x", SortPolicy::None);
        let location = Location::new("Ελλάδα", "Αθήνα, Κέντρο");
        let name = builder.build(&ts(1999, 12, 31, 23, 59, 59), &location, NamePrecision::Minute);
        assert!(name.file_name.is_ascii());
        assert!(name.file_name.starts_with("1999-12-31-23H59-"));
        assert!(name.file_name.ends_with("-x.jpg"));
        assert_eq!(name.file_name.matches('-').count(), 6);
    }
}
