// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::io::{self, Write};

use nix::errno::Errno;
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};
use suspend_types::{TtyMode, TtyToken};
use tracing::debug;

use crate::error::{Result, SysError};

/// The controlling terminal on stdin/stdout. Saved attributes are kept per
/// token so nested alterations restore in any order.
#[derive(Default)]
pub struct Terminal {
    saved: HashMap<TtyToken, Termios>,
    next_token: u32,
}

impl Terminal {
    pub fn alter(&mut self, mode: TtyMode) -> Result<TtyToken> {
        let stdin = io::stdin();
        let original = termios::tcgetattr(&stdin)?;

        let mut altered = original.clone();
        let action = match mode {
            TtyMode::NoSignals => {
                altered.local_flags.remove(LocalFlags::ISIG);
                SetArg::TCSANOW
            }
            TtyMode::PassphraseEntry => {
                altered
                    .local_flags
                    .remove(LocalFlags::ICANON | LocalFlags::ECHO);
                // Drop anything typed before the prompt appeared.
                SetArg::TCSAFLUSH
            }
        };
        termios::tcsetattr(&stdin, action, &altered)?;

        self.next_token += 1;
        let token = TtyToken(self.next_token);
        self.saved.insert(token, original);
        debug!("terminal altered for {mode:?} ({token:?})");
        Ok(token)
    }

    pub fn restore(&mut self, token: TtyToken) -> Result<()> {
        let original = self.saved.remove(&token).ok_or_else(|| {
            SysError::OperationFailed(format!("terminal state {} already restored", token.0))
        })?;
        termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &original)?;
        debug!("terminal restored ({token:?})");
        Ok(())
    }

    /// One byte straight from fd 0, bypassing std's stdin buffer so no copy
    /// of the passphrase stays behind in it.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match nix::unistd::read(io::stdin(), &mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
    }

    pub fn write_text(&mut self, text: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("saved", &self.saved.len())
            .field("next_token", &self.next_token)
            .finish()
    }
}
