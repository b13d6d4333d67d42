//! Primacy flag file
//!
//! The file's modification time tells external health checks when this host
//! last believed itself to be primary. Its content is irrelevant. Failures
//! here are reported to the caller, which logs them and carries on; they never
//! change an election or supervision outcome.

use filetime::FileTime;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Errors from updating the flag file
#[derive(Debug, thiserror::Error)]
pub enum PrimacySignalError {
    #[error("Failed to touch primacy flag {path}: {source}")]
    Touch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove primacy flag {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Optional flag file tracking local primacy
#[derive(Debug, Clone, Default)]
pub struct PrimacySignal {
    path: Option<PathBuf>,
}

impl PrimacySignal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A signal that does nothing
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create the file if needed and set its mtime to now
    pub fn touch(&self) -> Result<(), PrimacySignalError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let touch_err = |source| PrimacySignalError::Touch {
            path: path.clone(),
            source,
        };

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(touch_err)?;
        filetime::set_file_mtime(path, FileTime::now()).map_err(touch_err)
    }

    /// Remove the file; a file that is already gone is fine
    pub fn remove(&self) -> Result<(), PrimacySignalError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PrimacySignalError::Remove {
                path: path.clone(),
                source,
            }),
        }
    }
}
