//! Form state of the interactive front-end

use crate::config::{Options, SortPolicy};
use crate::tui::input::TextInput;
use std::path::PathBuf;

/// Focusable form controls, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Directory,
    Gps,
    Year,
    Month,
    FileTime,
    Revert,
    Suffix,
    Start,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Directory,
        Field::Gps,
        Field::Year,
        Field::Month,
        Field::FileTime,
        Field::Revert,
        Field::Suffix,
        Field::Start,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Directory => "Directory",
            Field::Gps => "Add location (GPS)",
            Field::Year => "Sort by year",
            Field::Month => "Sort by month",
            Field::FileTime => "Use file time without EXIF date",
            Field::Revert => "Revert previous runs",
            Field::Suffix => "Suffix",
            Field::Start => "Start",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, Field::Directory | Field::Suffix)
    }
}

/// Operation requested from the form
#[derive(Debug, Clone)]
pub enum Request {
    Process { directory: PathBuf, options: Options },
    Revert { directory: PathBuf },
}

impl Request {
    pub fn directory(&self) -> &PathBuf {
        match self {
            Request::Process { directory, .. } | Request::Revert { directory } => directory,
        }
    }
}

/// Status line content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running(String),
    Done(String),
    Failed(String),
}

/// Everything the form shows
#[derive(Debug, Clone)]
pub struct FormState {
    pub directory: TextInput,
    pub suffix: TextInput,
    pub gps: bool,
    pub year: bool,
    pub month: bool,
    pub file_time: bool,
    pub revert: bool,
    pub focus: Field,
    /// An operation is running; controls ignore input
    pub busy: bool,
    pub status: Status,
    /// Options the form starts from; toggles override them
    base: Options,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl FormState {
    pub fn new(base: Options) -> Self {
        Self {
            directory: TextInput::new(),
            suffix: TextInput::with_value(&base.suffix),
            gps: base.use_gps,
            year: matches!(base.sort, SortPolicy::Year | SortPolicy::YearAndMonth),
            month: matches!(base.sort, SortPolicy::Month | SortPolicy::YearAndMonth),
            file_time: base.fallback_to_file_time,
            revert: false,
            focus: Field::Directory,
            busy: false,
            status: Status::Idle,
            base,
        }
    }

    pub fn toggle_value(&self, field: Field) -> Option<bool> {
        match field {
            Field::Gps => Some(self.gps),
            Field::Year => Some(self.year),
            Field::Month => Some(self.month),
            Field::FileTime => Some(self.file_time),
            Field::Revert => Some(self.revert),
            _ => None,
        }
    }

    /// Flip the focused checkbox
    pub fn toggle(&mut self) {
        match self.focus {
            Field::Gps => self.gps = !self.gps,
            Field::Year => self.year = !self.year,
            Field::Month => self.month = !self.month,
            Field::FileTime => self.file_time = !self.file_time,
            Field::Revert => self.revert = !self.revert,
            _ => {}
        }
    }

    /// Text input under focus, if any
    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            Field::Directory => Some(&mut self.directory),
            Field::Suffix => Some(&mut self.suffix),
            _ => None,
        }
    }

    /// Operation described by the current form values
    pub fn request(&self) -> Result<Request, String> {
        let raw = self.directory.value().trim().trim_matches(['"', '\'']);
        if raw.is_empty() {
            return Err("Enter a directory first".to_string());
        }
        let directory = PathBuf::from(raw);
        if !directory.is_dir() {
            return Err(format!("Not a directory: {}", directory.display()));
        }

        if self.revert {
            return Ok(Request::Revert { directory });
        }

        let options = Options {
            sort: SortPolicy::from_flags(self.year, self.month),
            use_gps: self.gps,
            suffix: self.suffix.value().to_string(),
            fallback_to_file_time: self.file_time,
            ..self.base.clone()
        };
        Ok(Request::Process { directory, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_focus_wraps() {
        assert_eq!(Field::Directory.prev(), Field::Start);
        assert_eq!(Field::Start.next(), Field::Directory);
        assert_eq!(Field::Gps.next(), Field::Year);
    }

    #[test]
    fn test_request_requires_directory() {
        let form = FormState::default();
        assert!(form.request().is_err());

        let mut form = FormState::default();
        form.directory = TextInput::with_value("/definitely/not/here");
        assert!(form.request().unwrap_err().contains("Not a directory"));
    }

    #[test]
    fn test_process_request_from_toggles() {
        let dir = tempdir().unwrap();
        let mut form = FormState::default();
        form.directory = TextInput::with_value(&format!("\"{}\"", dir.path().display()));
        form.suffix = TextInput::with_value("Trip");
        form.focus = Field::Year;
        form.toggle();
        form.focus = Field::Month;
        form.toggle();

        match form.request().unwrap() {
            Request::Process { directory, options } => {
                assert_eq!(directory, dir.path());
                assert_eq!(options.sort, SortPolicy::YearAndMonth);
                assert_eq!(options.suffix, "Trip");
                assert!(!options.use_gps);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_revert_request() {
        let dir = tempdir().unwrap();
        let mut form = FormState::default();
        form.directory = TextInput::with_value(&dir.path().display().to_string());
        form.focus = Field::Revert;
        form.toggle();

        assert!(matches!(form.request().unwrap(), Request::Revert { .. }));
    }

    #[test]
    fn test_form_starts_from_options() {
        let form = FormState::new(Options {
            sort: SortPolicy::Month,
            use_gps: true,
            ..Options::default()
        });
        assert!(form.month && !form.year && form.gps);
    }
}
