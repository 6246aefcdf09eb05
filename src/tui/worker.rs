//! Background execution of form requests

use crate::busy::DirectoryLocks;
use crate::error::Result;
use crate::process::{ProcessReport, process_directory};
use crate::revert::{RevertOutcome, RevertReport, revert_directory};
use crate::tui::form::{Request, Status};
use std::sync::mpsc::{self, Receiver};
use tracing::{error, info};

/// Sent by the worker when its operation is over
#[derive(Debug)]
pub enum WorkerMessage {
    Processed(Result<ProcessReport>),
    Reverted(RevertReport),
}

/// Run `request` on a new thread
///
/// The directory is marked busy before the thread starts, so a second
/// request on it fails right away with `Error::Busy`.
pub fn spawn(request: Request, locks: &DirectoryLocks) -> Result<Receiver<WorkerMessage>> {
    let guard = locks.acquire(request.directory())?;
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let _guard = guard;
        let message = match request {
            Request::Process { directory, options } => {
                info!(?directory, "Starting process run");
                WorkerMessage::Processed(process_directory(&directory, options))
            }
            Request::Revert { directory } => {
                info!(?directory, "Starting revert");
                WorkerMessage::Reverted(revert_directory(&directory))
            }
        };
        if tx.send(message).is_err() {
            error!("Front-end went away before the operation finished");
        }
    });

    Ok(rx)
}

/// Status line for a finished operation
pub fn describe(message: &WorkerMessage) -> Status {
    match message {
        WorkerMessage::Processed(Ok(report)) => Status::Done(format!(
            "Renamed {}, unchanged {}, skipped {}",
            report.renamed.len(),
            report.unchanged.len(),
            report.skipped.len()
        )),
        WorkerMessage::Reverted(report) => match report.outcome {
            RevertOutcome::Success => Status::Done(format!(
                "Reverted: restored {}, skipped {}",
                report.restored,
                report.pair_failures.len()
            )),
            RevertOutcome::NoHistory => {
                Status::Done("No history found, nothing to revert".to_string())
            }
            RevertOutcome::Failure => match &report.error {
                Some(error) => Status::Failed(error.clone()),
                None => Status::Failed(format!(
                    "Revert incomplete: {} record(s) kept, restored {}",
                    report.failed_records.len(),
                    report.restored
                )),
            },
        },
        WorkerMessage::Processed(Err(e)) => Status::Failed(e.to_string()),
    }
}
