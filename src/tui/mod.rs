//! Interactive terminal front-end
//!
//! A single ratatui form: pick a directory, set the toggles, start a run or
//! a revert. The operation runs on a worker thread.

pub mod app;
pub mod event;
pub mod form;
pub mod input;
pub mod theme;
pub mod ui;
pub mod worker;

pub use app::TuiApp;
pub use event::{EventPoll, TuiEvent};
pub use form::{Field, FormState, Request, Status};
pub use input::TextInput;
pub use theme::{Theme, theme};
pub use ui::render;
pub use worker::WorkerMessage;

/// Whether to run the interactive front-end (no arguments given)
pub fn should_run_interactive() -> bool {
    std::env::args_os().len() == 1
}
