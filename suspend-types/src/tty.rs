// SPDX-License-Identifier: GPL-3.0-only

/// Terminal modes applied during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtyMode {
    /// Signal-generating characters off, so Ctrl-C cannot kill the session
    NoSignals,

    /// Canonical processing and echo off, pending input flushed
    PassphraseEntry,
}

/// Handle for one saved terminal state. Restoring it twice is an error on
/// the host side; callers guard against that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TtyToken(pub u32);
