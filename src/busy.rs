//! Per-directory busy flags
//!
//! A process run and a revert must not overlap on the same directory. Callers
//! that schedule operations from several threads take a `DirectoryGuard`
//! first; it is released when dropped.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Registry of directories with an operation in flight
#[derive(Debug, Clone, Default)]
pub struct DirectoryLocks {
    busy: Arc<Mutex<HashSet<PathBuf>>>,
}

impl DirectoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        match self.busy.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mark `directory` busy, failing with `Error::Busy` if it already is
    pub fn acquire(&self, directory: &Path) -> Result<DirectoryGuard> {
        let key = directory
            .canonicalize()
            .unwrap_or_else(|_| directory.to_path_buf());

        if !self.set().insert(key.clone()) {
            return Err(Error::Busy { path: key });
        }
        debug!(directory = ?key, "Directory marked busy");

        Ok(DirectoryGuard {
            locks: self.clone(),
            key,
        })
    }

    pub fn is_busy(&self, directory: &Path) -> bool {
        let key = directory
            .canonicalize()
            .unwrap_or_else(|_| directory.to_path_buf());
        self.set().contains(&key)
    }
}

/// Busy flag for one directory, cleared on drop
#[derive(Debug)]
pub struct DirectoryGuard {
    locks: DirectoryLocks,
    key: PathBuf,
}

impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        self.locks.set().remove(&self.key);
        debug!(directory = ?self.key, "Directory released");
    }
}
