// SPDX-License-Identifier: GPL-3.0-only

use suspend_types::{TtyMode, TtyToken};

use crate::SuspendError;

/// The controlling terminal.
pub trait Console {
    /// Save the current terminal state, then apply `mode` on top of it.
    fn alter_tty(&mut self, mode: TtyMode) -> Result<TtyToken, SuspendError>;

    /// Put back the state saved under `token`. Each token is restored once.
    fn restore_tty(&mut self, token: TtyToken) -> Result<(), SuspendError>;

    /// One input byte, or `None` at end of input.
    fn read_byte(&mut self) -> Result<Option<u8>, SuspendError>;

    fn write_text(&mut self, text: &str) -> Result<(), SuspendError>;

    /// Interactive shell; returns when it exits.
    fn debug_shell(&mut self) -> Result<(), SuspendError>;
}
