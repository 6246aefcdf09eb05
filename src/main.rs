//! Photo Sorter - rename photos after the moment they were taken
//!
//! Command-line entry point. Without arguments the interactive terminal
//! front-end starts instead.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use photo_sorter::{
    Cli, Options, Processor, RevertOutcome, TuiApp, revert_directory, should_run_interactive,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli_output {
    //! Colored console output for CLI mode

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    pub fn print_title(title: &str) {
        let padding = 60usize.saturating_sub(title.len()) / 2;
        let _ = stdout().execute(Print(" ".repeat(padding)));
        let _ = stdout().execute(Print(style(title).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_stat(key: &str, value: usize, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value.to_string()).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// One file line: status icon, source, then destination or reason
    pub fn print_result(icon: &str, color: Color, source: &str, detail: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(icon).with(color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(detail).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print(style("  Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<ExitCode> {
    if should_run_interactive() {
        run_interactive_mode()?;
        return Ok(ExitCode::SUCCESS);
    }

    run_cli_mode()
}

/// Run in interactive mode with Ratatui TUI
fn run_interactive_mode() -> Result<()> {
    let exe_dir = get_executable_dir()?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = exe_dir
        .join("Log")
        .join(format!("Interactive_{}.log", timestamp));

    // File-only logging, the terminal belongs to the TUI
    let _guard = setup_file_only_logging(&log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Photo Sorter starting in interactive mode"
    );

    let mut app = TuiApp::new(Options::default())?;
    app.set_log_path(log_path.clone());
    app.run()?;

    info!(log_file = %log_path.display(), "Interactive session complete");
    Ok(())
}

/// Run in standard CLI mode
fn run_cli_mode() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", Options::sample_config());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(directory) = cli.directory.clone() else {
        anyhow::bail!("No directory given. Run with --help for usage.");
    };

    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Photo Sorter starting");
    info!(log_file = %log_path.display(), "Log file location");

    let options = load_options(&cli, &exe_dir)?;
    if options.verbose {
        info!(?options, "Configuration loaded");
    }

    let outcome = if cli.revert {
        run_revert(&directory)
    } else {
        run_process(&directory, options)
    };

    cli_output::print_separator();
    cli_output::print_log_path(&log_path.display().to_string());

    match outcome {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Process `directory`; `Ok(false)` when some files could not be renamed
fn run_process(directory: &Path, options: Options) -> Result<bool> {
    use cli_output::*;

    let verbose = options.verbose;
    let report = Processor::new(options)?.run(directory)?;

    print_separator();
    print_title("Renaming complete");
    print_separator();
    print_blank();

    print_stat("Renamed", report.renamed.len(), CliTheme::SUCCESS);
    print_stat("Unchanged", report.unchanged.len(), CliTheme::ACCENT);
    print_stat("Skipped", report.skipped.len(), CliTheme::WARNING);
    print_blank();

    if verbose {
        for entry in &report.renamed {
            print_result(
                "✓",
                CliTheme::SUCCESS,
                &entry.old_path.display().to_string(),
                &format!("→ {}", entry.new_path.display()),
            );
        }
    }
    for skipped in &report.skipped {
        print_result(
            "⊘",
            CliTheme::WARNING,
            &skipped.source.display().to_string(),
            &skipped.reason.to_string(),
        );
    }

    if let Some(journal) = &report.journal {
        info!(journal = %journal.display(), "Run can be undone with --revert");
    }

    let failed = report.stats.failed.load(std::sync::atomic::Ordering::Relaxed);
    Ok(failed == 0)
}

/// Revert `directory`; `Ok(false)` when some journal records were kept
fn run_revert(directory: &Path) -> Result<bool> {
    use cli_output::*;

    let report = revert_directory(directory);
    if let Some(error) = &report.error {
        anyhow::bail!("Cannot revert {}: {}", directory.display(), error);
    }

    print_separator();
    match report.outcome {
        RevertOutcome::NoHistory => {
            print_warning("No history found for this directory, nothing to revert.");
            return Ok(true);
        }
        RevertOutcome::Success => print_title("Revert complete"),
        RevertOutcome::Failure => print_title("Revert incomplete"),
    }
    print_separator();
    print_blank();

    print_stat("Restored", report.restored, CliTheme::SUCCESS);
    print_stat("Skipped", report.pair_failures.len(), CliTheme::WARNING);
    print_stat("Kept records", report.failed_records.len(), CliTheme::ERROR);
    print_stat("Removed directories", report.removed_directories.len(), CliTheme::ACCENT);
    print_blank();

    for failure in &report.pair_failures {
        print_result(
            "⊘",
            CliTheme::WARNING,
            &failure.entry.new_path.display().to_string(),
            &failure.reason,
        );
    }
    for record in &report.failed_records {
        print_result(
            "✗",
            CliTheme::ERROR,
            &record.display().to_string(),
            "kept, could not be replayed",
        );
    }

    Ok(report.outcome == RevertOutcome::Success)
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    match cli.config_name() {
        Some(config_name) => log_dir
            .join(&config_name)
            .join(format!("{}_{}.log", config_name, timestamp)),
        None => log_dir.join(format!("PhotoSorter_{}.log", timestamp)),
    }
}

/// Resolve config path - `trip` also finds `trip.toml` and `<exe dir>/Config/trip.toml`
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };
    if with_extension.exists() {
        return with_extension;
    }

    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());
    let mut in_config_dir = exe_dir.join("Config").join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }
    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load options from the config file, if any, with CLI overrides
fn load_options(cli: &Cli, exe_dir: &Path) -> Result<Options> {
    let options = match &cli.config {
        Some(config_path) => {
            let resolved_path = resolve_config_path(exe_dir, config_path);
            info!(config_file = %resolved_path.display(), "Loading configuration from file");
            cli.merge_with_config(Options::load_from_file(&resolved_path)?)
        }
        None => cli.to_options(),
    };
    Ok(options)
}

/// Setup logging for CLI mode (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let (non_blocking, guard) = open_log_file(log_path)?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}

/// Setup logging for interactive mode (file only, no console)
fn setup_file_only_logging(log_path: &Path) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let (non_blocking, guard) = open_log_file(log_path)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}

fn open_log_file(
    log_path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    Ok(tracing_appender::non_blocking(file))
}
