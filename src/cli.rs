//! CLI argument parsing with clap

use crate::config::{CollisionPolicy, Options, SortPolicy};
use clap::Parser;
use std::path::PathBuf;

/// Photo Sorter - rename photos after the moment they were taken
///
/// Renames every JPEG of a directory to `YYYY-MM-DD-HHHmm[-Country][-Town][-suffix].jpg`,
/// optionally moving it into year or month subdirectories. Every run is
/// journaled and can be undone with `--revert`.
#[derive(Parser, Debug)]
#[command(name = "photo-sorter")]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the photos
    pub directory: Option<PathBuf>,

    /// Add country and town looked up from the GPS position
    #[arg(short = 'g', long)]
    pub gps: bool,

    /// Text appended to every new name
    #[arg(short = 's', long)]
    pub suffix: Option<String>,

    /// Undo every previous run on the directory
    #[arg(short = 'R', long)]
    pub revert: bool,

    /// Sort into `YYYY/` subdirectories (with --month: `YYYY/MM/`)
    #[arg(short = 'y', long)]
    pub year: bool,

    /// Sort into `YYYY-MM/` subdirectories (with --year: `YYYY/MM/`)
    #[arg(short = 'm', long)]
    pub month: bool,

    /// Use the file modification time when a photo has no capture date
    #[arg(short = 'f', long)]
    pub file_time: bool,

    /// How photos taken in the same minute are told apart
    #[arg(long, value_enum)]
    pub collision: Option<CollisionPolicy>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Number of threads for reading metadata (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    fn sort_policy(&self) -> Option<SortPolicy> {
        (self.year || self.month).then(|| SortPolicy::from_flags(self.year, self.month))
    }

    /// Merge CLI arguments with options from a config file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut options: Options) -> Options {
        if let Some(sort) = self.sort_policy() {
            options.sort = sort;
        }
        if self.gps {
            options.use_gps = true;
        }
        if let Some(ref suffix) = self.suffix {
            options.suffix = suffix.clone();
        }
        if self.file_time {
            options.fallback_to_file_time = true;
        }
        if let Some(collision) = self.collision {
            options.collision = collision;
        }
        if let Some(threads) = self.threads {
            options.threads = threads;
        }
        if self.verbose {
            options.verbose = true;
        }

        options
    }

    /// Build options from CLI arguments only
    pub fn to_options(&self) -> Options {
        self.merge_with_config(Options::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("photo-sorter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_sort_flags() {
        assert_eq!(parse(&["dir"]).to_options().sort, SortPolicy::None);
        assert_eq!(parse(&["dir", "-y"]).to_options().sort, SortPolicy::Year);
        assert_eq!(parse(&["dir", "-m"]).to_options().sort, SortPolicy::Month);
        assert_eq!(
            parse(&["dir", "-y", "-m"]).to_options().sort,
            SortPolicy::YearAndMonth
        );
    }

    #[test]
    fn test_full_command_line() {
        let cli = parse(&[
            "/photos",
            "-g",
            "-s",
            "Holidays",
            "-f",
            "--collision",
            "seconds",
            "-t",
            "4",
        ]);
        assert_eq!(cli.directory, Some(PathBuf::from("/photos")));
        assert!(!cli.revert);

        let options = cli.to_options();
        assert!(options.use_gps);
        assert_eq!(options.suffix, "Holidays");
        assert!(options.fallback_to_file_time);
        assert_eq!(options.collision, CollisionPolicy::Seconds);
        assert_eq!(options.threads, 4);
    }

    #[test]
    fn test_revert_flag() {
        let cli = parse(&["-R", "/photos"]);
        assert!(cli.revert);
    }

    #[test]
    fn test_cli_overrides_config() {
        let file_options = Options {
            sort: SortPolicy::Year,
            suffix: "FromFile".into(),
            use_gps: true,
            ..Options::default()
        };

        let merged = parse(&["dir", "-m"]).merge_with_config(file_options.clone());
        assert_eq!(merged.sort, SortPolicy::Month);
        assert_eq!(merged.suffix, "FromFile");
        assert!(merged.use_gps);

        let merged = parse(&["dir"]).merge_with_config(file_options);
        assert_eq!(merged.sort, SortPolicy::Year);
    }

    #[test]
    fn test_config_name() {
        let cli = parse(&["dir", "-C", "configs/trip.toml"]);
        assert_eq!(cli.config_name().as_deref(), Some("trip"));
    }

    #[test]
    fn test_help_shows_name_pattern() {
        use clap::CommandFactory;

        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("YYYY-MM-DD-HHHmm[-Country][-Town][-suffix].jpg"));
        assert!(!help.contains("HHhMM"));
    }
}
