// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use suspend_types::handoff::{DecodeError, EncodeError};
use suspend_types::RegistryError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendErrorKind {
    /// Malformed volume or key-file configuration
    Config,
    /// A lock or unlock command failed
    VolumeOp,
    /// The resume environment could not be prepared or entered
    Environment,
    /// The handoff payload did not decode
    Decode,
    /// Terminal, service or filesystem operation failed
    Io,
}

impl SuspendErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Config => "configuration error",
            Self::VolumeOp => "volume operation failed",
            Self::Environment => "resume environment error",
            Self::Decode => "handoff decode error",
            Self::Io => "I/O error",
        }
    }
}

impl fmt::Display for SuspendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SuspendError {
    pub kind: SuspendErrorKind,
    pub message: String,
}

impl SuspendError {
    pub fn new(kind: SuspendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(SuspendErrorKind::Config, message)
    }

    pub fn volume_op(message: impl Into<String>) -> Self {
        Self::new(SuspendErrorKind::VolumeOp, message)
    }

    pub fn environment(message: impl Into<String>) -> Self {
        Self::new(SuspendErrorKind::Environment, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(SuspendErrorKind::Io, message)
    }

    /// Prefix the message with what was being done.
    pub fn context(mut self, what: impl fmt::Display) -> Self {
        self.message = format!("{what}: {}", self.message);
        self
    }
}

impl From<DecodeError> for SuspendError {
    fn from(error: DecodeError) -> Self {
        Self::new(SuspendErrorKind::Decode, error.to_string())
    }
}

impl From<EncodeError> for SuspendError {
    fn from(error: EncodeError) -> Self {
        Self::environment(error.to_string())
    }
}

impl From<RegistryError> for SuspendError {
    fn from(error: RegistryError) -> Self {
        Self::config(error.to_string())
    }
}

impl From<std::io::Error> for SuspendError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_the_right_kind() {
        let decode: SuspendError = suspend_types::handoff::decode(&[0, 0]).unwrap_err().into();
        assert_eq!(decode.kind, SuspendErrorKind::Decode);

        let registry: SuspendError = RegistryError::DuplicateName("a".into()).into();
        assert_eq!(registry.kind, SuspendErrorKind::Config);

        let io: SuspendError = std::io::Error::other("tty gone").into();
        assert_eq!(io.kind, SuspendErrorKind::Io);
    }

    #[test]
    fn context_prefixes_message() {
        let error = SuspendError::volume_op("exit status 2").context("locking cryptroot");
        assert_eq!(
            error.to_string(),
            "volume operation failed: locking cryptroot: exit status 2"
        );
    }
}
