// SPDX-License-Identifier: GPL-3.0-only

use suspend_contracts::{Console, PowerOps, SuspendError};
use suspend_types::{TtyMode, TtyToken, Volume};
use tracing::{debug, warn};

use super::editor::{LineEditor, PromptFeatures, Step};
use super::Passphrase;

#[derive(Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    Passphrase(Passphrase),
    /// The user asked to look for the key-file again
    Rescan,
    Cancelled,
}

pub fn prompt_text(volume: &Volume, features: PromptFeatures) -> String {
    let mut hints = Vec::new();
    if features.suspend {
        hints.push("Press Escape to suspend to RAM");
    }
    if features.rescan {
        hints.push("Ctrl-R to rescan block devices for keyfiles");
    }
    if features.debug_shell {
        hints.push("Ctrl-T to start a debug shell");
    }

    let mut text = String::from("\n");
    if !hints.is_empty() {
        let mut line = hints.join(", or ");
        if !features.suspend {
            line.insert_str(0, "Press ");
        }
        text.push_str(&line);
        text.push_str(".\n\n");
    }
    text.push_str(&format!("Enter passphrase for {}: ", volume.name));
    text
}

/// Saved terminal state for the duration of one prompt. Restores at most
/// once no matter how many exit paths ask for it.
struct RawTty {
    token: Option<TtyToken>,
}

impl RawTty {
    fn enter<H: Console + ?Sized>(host: &mut H) -> Self {
        match host.alter_tty(TtyMode::PassphraseEntry) {
            Ok(token) => Self { token: Some(token) },
            Err(error) => {
                // Entry still works line-buffered, only with echo.
                warn!("cannot switch terminal to passphrase mode: {error}");
                Self { token: None }
            }
        }
    }

    fn restore<H: Console + ?Sized>(&mut self, host: &mut H) -> Result<(), SuspendError> {
        match self.token.take() {
            Some(token) => host.restore_tty(token),
            None => Ok(()),
        }
    }
}

/// Read one passphrase for `volume` from the terminal.
///
/// The terminal is in passphrase mode only while this runs and is restored
/// exactly once on every way out: right after the newline on submit, or
/// before returning otherwise.
pub fn read_passphrase<H>(
    host: &mut H,
    volume: &Volume,
    features: PromptFeatures,
) -> Result<PromptOutcome, SuspendError>
where
    H: Console + PowerOps + ?Sized,
{
    let mut tty = RawTty::enter(host);
    let outcome = edit_line(host, &mut tty, volume, features);
    let restored = tty.restore(host);
    let outcome = outcome?;
    restored?;
    Ok(outcome)
}

fn edit_line<H>(
    host: &mut H,
    tty: &mut RawTty,
    volume: &Volume,
    features: PromptFeatures,
) -> Result<PromptOutcome, SuspendError>
where
    H: Console + PowerOps + ?Sized,
{
    let prompt = prompt_text(volume, features);
    host.write_text(&prompt)?;

    let mut editor = LineEditor::new(features);
    loop {
        let Some(byte) = host.read_byte()? else {
            return Err(SuspendError::io("end of input while reading passphrase"));
        };

        match editor.feed(byte) {
            Step::Continue => {}
            Step::Suspend => {
                debug!("suspending to RAM");
                host.suspend_to_ram()?;
                host.write_text("\n")?;
                host.write_text(&prompt)?;
                editor.resume_editing();
            }
            Step::DebugShell => {
                host.write_text("\n")?;
                tty.restore(host)?;
                let shell = host.debug_shell();
                *tty = RawTty::enter(host);
                if let Err(error) = shell {
                    warn!("debug shell failed: {error}");
                }
                host.write_text(&prompt)?;
                editor.resume_editing();
            }
            Step::Submit(passphrase) => {
                host.write_text("\n")?;
                tty.restore(host)?;
                return Ok(PromptOutcome::Passphrase(passphrase));
            }
            Step::Rescan => {
                host.write_text("\n")?;
                return Ok(PromptOutcome::Rescan);
            }
            Step::Cancel => {
                host.write_text("\n")?;
                return Ok(PromptOutcome::Cancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suspend_testing::{Call, CallKind, FakeHost};

    fn gate_features() -> PromptFeatures {
        PromptFeatures {
            suspend: true,
            ..PromptFeatures::default()
        }
    }

    #[test]
    fn submit_restores_terminal_once() {
        let mut host = FakeHost::new().with_input(b"secret\n");
        let volume = Volume::new("cryptroot", true);

        let outcome = read_passphrase(&mut host, &volume, gate_features()).expect("prompt");
        assert_eq!(
            outcome,
            PromptOutcome::Passphrase(Passphrase::from(b"secret".as_slice()))
        );
        assert_eq!(host.count(CallKind::AlterTty), 1);
        assert_eq!(host.count(CallKind::RestoreTty), 1);
        assert_eq!(host.double_restores, 0);
        assert!(host.open_ttys().is_empty());
    }

    #[test]
    fn escape_suspends_once_and_drops_earlier_input() {
        let mut host = FakeHost::new().with_input(b"wro\x1bpass\n");
        let volume = Volume::new("cryptroot", true);

        let outcome = read_passphrase(&mut host, &volume, gate_features()).expect("prompt");
        assert_eq!(
            outcome,
            PromptOutcome::Passphrase(Passphrase::from(b"pass".as_slice()))
        );
        assert_eq!(host.count(CallKind::SuspendToRam), 1);
        assert_eq!(host.output.matches("Enter passphrase for cryptroot").count(), 2);
    }

    #[test]
    fn cancel_and_rescan_restore_on_exit() {
        let volume = Volume::new("cryptroot", true);

        let mut host = FakeHost::new().with_input(b"abc\x03");
        let outcome = read_passphrase(&mut host, &volume, gate_features()).expect("prompt");
        assert_eq!(outcome, PromptOutcome::Cancelled);
        assert_eq!(host.count(CallKind::RestoreTty), 1);

        let features = PromptFeatures {
            rescan: true,
            ..gate_features()
        };
        let mut host = FakeHost::new().with_input(b"\x12");
        let outcome = read_passphrase(&mut host, &volume, features).expect("prompt");
        assert_eq!(outcome, PromptOutcome::Rescan);
        assert_eq!(host.count(CallKind::RestoreTty), 1);
    }

    #[test]
    fn failure_inside_the_loop_still_restores() {
        let mut host = FakeHost::new().with_input(b"\x1b");
        host.fail_once(CallKind::SuspendToRam);
        let volume = Volume::new("cryptroot", true);

        let error = read_passphrase(&mut host, &volume, gate_features()).expect_err("fails");
        assert_eq!(error.kind, suspend_contracts::SuspendErrorKind::Io);
        assert_eq!(host.count(CallKind::RestoreTty), 1);
        assert!(host.open_ttys().is_empty());
    }

    #[test]
    fn end_of_input_is_an_error() {
        let mut host = FakeHost::new().with_input(b"partial");
        let volume = Volume::new("crypthome", false);

        assert!(read_passphrase(&mut host, &volume, PromptFeatures::default()).is_err());
        assert_eq!(host.count(CallKind::RestoreTty), 1);
    }

    #[test]
    fn debug_shell_runs_with_terminal_restored() {
        let mut host = FakeHost::new().with_input(b"\x14ok\n");
        let volume = Volume::new("cryptroot", true);
        let features = PromptFeatures {
            debug_shell: true,
            ..gate_features()
        };

        let outcome = read_passphrase(&mut host, &volume, features).expect("prompt");
        assert_eq!(
            outcome,
            PromptOutcome::Passphrase(Passphrase::from(b"ok".as_slice()))
        );

        let tty_calls: Vec<&Call> = host
            .calls
            .iter()
            .filter(|call| {
                matches!(
                    call.kind(),
                    CallKind::AlterTty | CallKind::RestoreTty | CallKind::DebugShell
                )
            })
            .collect();
        assert_eq!(tty_calls.len(), 5);
        assert_eq!(tty_calls[2].kind(), CallKind::DebugShell);
        assert_eq!(tty_calls[1].kind(), CallKind::RestoreTty);
        assert_eq!(tty_calls[3].kind(), CallKind::AlterTty);
        assert!(host.open_ttys().is_empty());
    }

    #[test]
    fn prompt_lists_live_commands() {
        let volume = Volume::new("cryptroot", true);
        let all = PromptFeatures {
            suspend: true,
            rescan: true,
            debug_shell: true,
        };
        assert_eq!(
            prompt_text(&volume, all),
            "\nPress Escape to suspend to RAM, or Ctrl-R to rescan block devices for keyfiles, \
             or Ctrl-T to start a debug shell.\n\nEnter passphrase for cryptroot: "
        );
        assert_eq!(
            prompt_text(&volume, PromptFeatures::default()),
            "\nEnter passphrase for cryptroot: "
        );
    }
}
