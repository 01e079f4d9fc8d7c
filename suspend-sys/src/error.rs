// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use suspend_contracts::{SuspendError, SuspendErrorKind};
use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("system call failed: {0}")]
    Errno(#[from] nix::errno::Errno),

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("{path:?}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl SysError {
    pub fn into_suspend(self, kind: SuspendErrorKind) -> SuspendError {
        SuspendError::new(kind, self.to_string())
    }
}

impl From<SysError> for SuspendError {
    fn from(error: SysError) -> Self {
        error.into_suspend(SuspendErrorKind::Io)
    }
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
