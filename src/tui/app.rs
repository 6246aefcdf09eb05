//! TUI application main module
//!
//! Contains TUI application creation and running logic.

use crate::busy::DirectoryLocks;
use crate::config::Options;
use crate::tui::event::{EventPoll, TuiEvent, disable_bracketed_paste, enable_bracketed_paste};
use crate::tui::form::{Field, FormState, Request, Status};
use crate::tui::ui::render;
use crate::tui::worker::{self, WorkerMessage};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::{info, warn};

/// TUI application
#[derive(Debug)]
pub struct TuiApp {
    pub terminal: DefaultTerminal,
    pub event_poll: EventPoll,
    pub state: FormState,
    locks: DirectoryLocks,
    /// Completion channel of the running operation
    worker: Option<Receiver<WorkerMessage>>,
    log_path: Option<PathBuf>,
}

impl TuiApp {
    /// Create new TUI application
    pub fn new(options: Options) -> std::io::Result<Self> {
        let terminal = ratatui::init();
        if let Err(e) = enable_bracketed_paste() {
            warn!(error = %e, "Bracketed paste unavailable");
        }

        Ok(Self {
            terminal,
            event_poll: EventPoll::default(),
            state: FormState::new(options),
            locks: DirectoryLocks::new(),
            worker: None,
            log_path: None,
        })
    }

    /// Set log path
    pub fn set_log_path(&mut self, path: PathBuf) {
        self.log_path = Some(path);
    }

    /// Run until the user quits
    pub fn run(&mut self) -> std::io::Result<()> {
        let result = self.event_loop();

        let _ = disable_bracketed_paste();
        ratatui::restore();
        result
    }

    fn event_loop(&mut self) -> std::io::Result<()> {
        loop {
            self.poll_worker();
            render(&mut self.terminal, &self.state, self.log_path.as_deref())?;

            match self.event_poll.next() {
                TuiEvent::None | TuiEvent::Resize => {}
                TuiEvent::CtrlC | TuiEvent::Escape if !self.state.busy => break,
                // A running operation must not be cut short
                _ if self.state.busy => {}
                event => self.handle_event(event),
            }
        }
        Ok(())
    }

    /// Pick up the result of a finished operation
    fn poll_worker(&mut self) {
        let Some(rx) = &self.worker else {
            return;
        };

        let status = match rx.try_recv() {
            Ok(message) => {
                if let WorkerMessage::Processed(Ok(report)) = &message {
                    for skipped in &report.skipped {
                        info!(source = ?skipped.source, reason = %skipped.reason, "Skipped");
                    }
                }
                worker::describe(&message)
            }
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                Status::Failed("Operation stopped unexpectedly".to_string())
            }
        };

        info!(?status, "Operation finished");
        self.state.status = status;
        self.state.busy = false;
        self.worker = None;
    }

    fn handle_event(&mut self, event: TuiEvent) {
        match event {
            TuiEvent::Tab | TuiEvent::Down => self.state.focus = self.state.focus.next(),
            TuiEvent::BackTab | TuiEvent::Up => self.state.focus = self.state.focus.prev(),
            TuiEvent::Enter => match self.state.focus {
                Field::Directory | Field::Suffix | Field::Start => self.start(),
                _ => self.state.toggle(),
            },
            TuiEvent::Char(' ') if !self.state.focus.is_text() => match self.state.focus {
                Field::Start => self.start(),
                _ => self.state.toggle(),
            },
            event => {
                let Some(input) = self.state.focused_input() else {
                    return;
                };
                match event {
                    TuiEvent::Char(c) => input.insert(c),
                    TuiEvent::Paste(text) => input.insert_str(&text),
                    TuiEvent::Backspace => input.backspace(),
                    TuiEvent::Delete => input.delete(),
                    TuiEvent::Left => input.left(),
                    TuiEvent::Right => input.right(),
                    TuiEvent::Home => input.home(),
                    TuiEvent::End => input.end(),
                    _ => {}
                }
            }
        }
    }

    /// Hand the current form values to a worker thread
    fn start(&mut self) {
        let request = match self.state.request() {
            Ok(request) => request,
            Err(message) => {
                self.state.status = Status::Failed(message);
                return;
            }
        };

        let running = match &request {
            Request::Process { directory, .. } => {
                format!("Renaming photos in {}...", directory.display())
            }
            Request::Revert { directory } => format!("Reverting {}...", directory.display()),
        };

        match worker::spawn(request, &self.locks) {
            Ok(rx) => {
                self.worker = Some(rx);
                self.state.busy = true;
                self.state.status = Status::Running(running);
            }
            Err(e) => self.state.status = Status::Failed(e.to_string()),
        }
    }
}
