// SPDX-License-Identifier: GPL-3.0-only

//! Resuming volumes, and the flow that runs inside the resume environment

use suspend_contracts::{SuspendError, SuspendHost};
use suspend_types::{KeyfileState, Volume, VolumeRegistry};
use tracing::{debug, info, warn};

use crate::controller::SessionOptions;
use crate::input::{PromptFeatures, PromptOutcome, read_passphrase};
use crate::sequencer::{self, Unlock};
use crate::session::{Escalation, Release, Session};

/// Where a prompt happens, which decides what Escape and Ctrl-C mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Root still locked: Escape may sleep again, and the prompt never gives
    /// up.
    Gate,
    /// Root is back: no sleeping from the prompt, Ctrl-C skips the volume.
    AfterGate,
}

/// Unlock one volume, trying its key-file first and then asking for a
/// passphrase until one works.
pub fn resume_volume<H: SuspendHost + ?Sized>(
    host: &mut H,
    volume: &Volume,
    mode: PromptMode,
    debug_mode: bool,
) -> Result<(), SuspendError> {
    loop {
        if try_keyfile(host, volume)? {
            return Ok(());
        }

        let features = PromptFeatures {
            suspend: mode == PromptMode::Gate,
            rescan: mode == PromptMode::Gate && volume.has_keyfile(),
            debug_shell: debug_mode,
        };

        match read_passphrase(host, volume, features)? {
            PromptOutcome::Passphrase(passphrase) => {
                match sequencer::unlock_one(host, volume, Unlock::Passphrase(&passphrase)) {
                    Ok(()) => return Ok(()),
                    Err(error) => {
                        // cryptsetup's message goes to the log only.
                        debug!("{error}");
                        host.write_text("Unlock failed, try again.\n")?;
                    }
                }
            }
            PromptOutcome::Rescan => info!("rescanning for keyfile of {volume}"),
            PromptOutcome::Cancelled if mode == PromptMode::Gate => {
                debug!("passphrase entry cancelled, prompting again");
            }
            PromptOutcome::Cancelled => {
                return Err(SuspendError::volume_op(format!(
                    "passphrase entry for {} cancelled",
                    volume.name
                )));
            }
        }
    }
}

/// Returns whether the key-file unlocked the volume.
fn try_keyfile<H: SuspendHost + ?Sized>(
    host: &mut H,
    volume: &Volume,
) -> Result<bool, SuspendError> {
    let Some(keyfile) = volume.keyfile.as_ref() else {
        return Ok(false);
    };

    match KeyfileState::of(Some(keyfile), |keyfile| host.keyfile_available(keyfile)) {
        KeyfileState::Available => {
            host.write_text(&format!(
                "Attempting to unlock {} with keyfile...\n",
                volume.name
            ))?;
            match sequencer::unlock_one(host, volume, Unlock::Keyfile(keyfile)) {
                Ok(()) => Ok(true),
                Err(error) => {
                    warn!("{error}");
                    Ok(false)
                }
            }
        }
        KeyfileState::Unavailable => {
            host.write_text("Keyfile unavailable.\n")?;
            Ok(false)
        }
        KeyfileState::Undefined => Ok(false),
    }
}

/// Everything that happens inside the resume environment: lock all
/// volumes, sleep, and bring the gate volume back.
///
/// The whole run is strict until the gate volume is unlocked; the caller
/// learns about success only through the `Ok`.
pub fn run_resume_environment<H: SuspendHost + ?Sized>(
    host: &mut H,
    registry: VolumeRegistry,
    options: &SessionOptions,
) -> Result<(), SuspendError> {
    let mut session = Session::new(registry);
    let result = drive(host, &mut session, options);
    session.finish(host, result)
}

fn drive<H: SuspendHost + ?Sized>(
    host: &mut H,
    session: &mut Session,
    options: &SessionOptions,
) -> Result<(), SuspendError> {
    let Some(gate) = session.registry().gate().cloned() else {
        return Err(SuspendError::config("no volumes were handed over"));
    };

    debug!("locking {} volume(s)", session.registry().len());
    let locked = sequencer::lock_all(host, session.registry().volumes());
    session.attempt("locking volumes", locked)?;

    debug!("suspending to RAM");
    session.attempt("suspending to RAM", host.suspend_to_ram())?;

    debug!("starting device-event daemon");
    session.attempt("starting device-event daemon", host.start_device_daemon())?;
    session.acquire(Release::StopDeviceDaemon);

    debug!("resuming {gate}");
    let resumed = resume_volume(host, &gate, PromptMode::Gate, options.debug);
    session.attempt(format_args!("resuming {}", gate.name), resumed)?;
    session.escalate(Escalation::GateUnlocked);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use suspend_testing::{Call, CallKind, FakeHost};
    use suspend_types::Keyfile;

    fn root_with_keyfile() -> Volume {
        Volume::new("cryptroot", true).with_keyfile(Keyfile::on_device(
            "/dev/disk/by-uuid/AAAA-BBBB",
            Some("vfat".into()),
            "root.key",
        ))
    }

    #[test]
    fn keyfile_first_when_available() {
        let volume = root_with_keyfile();
        let mut host = FakeHost::new();
        host.make_available(volume.keyfile.as_ref().expect("keyfile"));

        resume_volume(&mut host, &volume, PromptMode::Gate, false).expect("resume");
        assert_eq!(host.count(CallKind::UnlockKeyfile), 1);
        assert_eq!(host.count(CallKind::AlterTty), 0);
    }

    #[test]
    fn unavailable_keyfile_falls_back_to_prompt_and_rescan_retries() {
        let volume = root_with_keyfile();
        let mut host = FakeHost::new().with_input(b"\x12");
        host.make_available_after(volume.keyfile.as_ref().expect("keyfile"), 1);

        resume_volume(&mut host, &volume, PromptMode::Gate, false).expect("resume");
        assert!(host.output.contains("Keyfile unavailable."));
        assert!(host.output.contains("Attempting to unlock cryptroot with keyfile..."));
        assert_eq!(host.count(CallKind::UnlockKeyfile), 1);
        assert_eq!(host.count(CallKind::UnlockPassphrase), 0);
    }

    #[test]
    fn wrong_passphrase_prompts_again_without_echoing_it() {
        let volume = Volume::new("cryptroot", true);
        let mut host = FakeHost::new()
            .with_passphrase("cryptroot", b"right")
            .with_input(b"wrong\n\x03right\n");

        resume_volume(&mut host, &volume, PromptMode::Gate, false).expect("resume");
        assert_eq!(host.count(CallKind::UnlockPassphrase), 2);
        assert!(host.output.contains("Unlock failed, try again."));
        assert!(!host.output.contains("wrong"));
        assert_eq!(host.count(CallKind::AlterTty), host.count(CallKind::RestoreTty));
    }

    #[test]
    fn cancel_skips_volume_after_gate() {
        let volume = Volume::new("crypthome", false);
        let mut host = FakeHost::new().with_input(b"\x03");

        let error =
            resume_volume(&mut host, &volume, PromptMode::AfterGate, false).expect_err("skip");
        assert!(error.message.contains("cancelled"));
    }

    #[test]
    fn escape_is_ordinary_input_after_gate() {
        let volume = Volume::new("crypthome", false);
        let mut host = FakeHost::new()
            .with_passphrase("crypthome", b"a\x1bb")
            .with_input(b"a\x1bb\n");

        resume_volume(&mut host, &volume, PromptMode::AfterGate, false).expect("resume");
        assert_eq!(host.count(CallKind::SuspendToRam), 0);
    }

    #[test]
    fn rescan_is_ordinary_input_after_gate() {
        let volume =
            Volume::new("crypthome", false).with_keyfile(Keyfile::at("/etc/keys/home.key"));
        let mut host = FakeHost::new()
            .with_passphrase("crypthome", b"a\x12b")
            .with_input(b"a\x12b\n");

        resume_volume(&mut host, &volume, PromptMode::AfterGate, false).expect("resume");
        assert_eq!(host.count(CallKind::UnlockPassphrase), 1);
        assert_eq!(host.count(CallKind::UnlockKeyfile), 0);
        assert_eq!(host.output.matches("Keyfile unavailable.").count(), 1);
    }

    #[test]
    fn resume_environment_locks_sleeps_and_unlocks_gate() {
        let registry = VolumeRegistry::from_discovery(vec![
            Volume::new("cryptswap", false),
            Volume::new("cryptroot", true),
            Volume::new("crypthome", false),
        ])
        .expect("registry");
        let mut host = FakeHost::new()
            .with_passphrase("cryptroot", b"pass")
            .with_input(b"x\x1bpass\n");

        run_resume_environment(&mut host, registry, &SessionOptions::default()).expect("resume");

        let volume_calls: Vec<&Call> = host
            .calls
            .iter()
            .filter(|call| {
                matches!(
                    call.kind(),
                    CallKind::Lock
                        | CallKind::SuspendToRam
                        | CallKind::StartDeviceDaemon
                        | CallKind::StopDeviceDaemon
                        | CallKind::UnlockPassphrase
                )
            })
            .collect();
        assert_eq!(
            volume_calls,
            vec![
                &Call::Lock("crypthome".into()),
                &Call::Lock("cryptswap".into()),
                &Call::Lock("cryptroot".into()),
                &Call::SuspendToRam,
                &Call::StartDeviceDaemon,
                &Call::SuspendToRam,
                &Call::UnlockPassphrase("cryptroot".into()),
                &Call::StopDeviceDaemon,
            ]
        );
    }

    #[test]
    fn resume_environment_is_strict_until_gate() {
        let registry =
            VolumeRegistry::new(vec![Volume::new("cryptroot", true)]).expect("registry");
        let mut host = FakeHost::new();
        host.fail_once(CallKind::Lock);

        let error = run_resume_environment(&mut host, registry, &SessionOptions::default())
            .expect_err("lock failure is fatal");
        assert!(error.message.starts_with("locking volumes"));
        assert_eq!(host.count(CallKind::SuspendToRam), 0);
    }

    #[test]
    fn empty_handoff_is_rejected() {
        let mut host = FakeHost::new();
        assert!(
            run_resume_environment(&mut host, VolumeRegistry::default(), &SessionOptions::default())
                .is_err()
        );
        assert!(host.calls.is_empty());
    }
}
