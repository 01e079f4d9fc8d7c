// SPDX-License-Identifier: GPL-3.0-only

//! The full-privilege side of one suspend/resume cycle
//!
//! Everything up to and including the hardware suspend is strict: the first
//! failure aborts the cycle and unwinds what was acquired. Once the resume
//! environment reports the gate volume unlocked, the rest of the cycle is
//! best effort.

use suspend_contracts::{SuspendError, SuspendHost};
use suspend_types::{HookPhase, SUSPEND_SERVICES, TtyMode, Volume, VolumeRegistry};
use tracing::{debug, info, warn};

use crate::resume::{PromptMode, resume_volume};
use crate::session::{Escalation, Release, ReleaseKind, Session};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Verbose diagnostics and the Ctrl-T debug shell
    pub debug: bool,
}

/// Run one cycle: harden, suspend inside the resume environment, unwind.
pub fn run_suspend<H: SuspendHost + ?Sized>(
    host: &mut H,
    options: &SessionOptions,
) -> Result<(), SuspendError> {
    let mut session = Session::new(VolumeRegistry::default());
    let result = drive(host, &mut session, options);
    session.finish(host, result)
}

fn drive<H: SuspendHost + ?Sized>(
    host: &mut H,
    session: &mut Session,
    options: &SessionOptions,
) -> Result<(), SuspendError> {
    // Ctrl-C must not kill us halfway through.
    match host.alter_tty(TtyMode::NoSignals) {
        Ok(token) => session.acquire(Release::RestoreTty(token)),
        Err(error) => warn!("cannot disable terminal signals: {error}"),
    }

    session.attempt("checking resume environment", host.check_environment())?;

    let discovered = session.attempt("discovering volumes", host.discover_volumes())?;
    let registry = VolumeRegistry::from_discovery(discovered.unwrap_or_default())
        .map_err(|error| SuspendError::from(error).context("discovering volumes"))?;
    for volume in &registry {
        debug!("found {volume}");
    }
    *session.registry_mut() = registry;

    if session.registry().is_empty() {
        session.escalate(Escalation::NoVolumes);
    }

    session.attempt("running pre-suspend hooks", host.run_sleep_hooks(HookPhase::Pre))?;
    session.acquire(Release::PostSuspendHooks);

    if session.registry().is_empty() {
        warn!("no encrypted volumes found, suspending without locking");
        session.attempt("suspending to RAM", host.suspend_to_ram())?;
        return Ok(());
    }

    let barriers = session
        .attempt("inventorying write barriers", host.barrier_inventory())?
        .unwrap_or_default();

    session.attempt("preparing resume environment", host.prepare_environment())?;
    session.acquire(Release::TeardownEnvironment);

    let stopped = session
        .attempt("stopping services", host.stop_services(SUSPEND_SERVICES))?
        .unwrap_or_default();
    session.acquire(Release::RestartServices(stopped));

    session.attempt("flushing writes", host.sync())?;

    session.attempt("disabling write barriers", host.disable_barriers(&barriers))?;
    session.acquire(Release::EnableBarriers(barriers));

    info!("locking {} volume(s) and suspending", session.registry().len());
    let suspended = host.suspend_in_environment(session.registry());
    session.attempt("suspending in resume environment", suspended)?;

    // Device events are needed for key-file media as early as possible. Still
    // strict: stopped services must not be left stopped.
    session.release_early(host, ReleaseKind::Services)?;
    session.escalate(Escalation::GateUnlocked);

    resume_remaining(host, session, options)
}

fn resume_remaining<H: SuspendHost + ?Sized>(
    host: &mut H,
    session: &mut Session,
    options: &SessionOptions,
) -> Result<(), SuspendError> {
    if let Some(keyfiles) = session.attempt("reading crypttab", host.crypttab_keyfiles())? {
        let applied = session.registry_mut().apply_keyfiles(keyfiles);
        debug!("{applied} key-file(s) from crypttab");
    }

    let remaining: Vec<Volume> = session.registry().after_gate().cloned().collect();
    for volume in &remaining {
        info!("resuming {volume}");
        let resumed = resume_volume(host, volume, PromptMode::AfterGate, options.debug);
        session.attempt(format_args!("resuming {}", volume.name), resumed)?;
    }
    Ok(())
}
