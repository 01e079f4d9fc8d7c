// SPDX-License-Identifier: GPL-3.0-only

use suspend_contracts::{SuspendError, SuspendHost};
use suspend_types::{BarrierRecord, HookPhase, ServiceRecord, TtyToken};
use tracing::{debug, warn};

/// The release half of an acquired resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    RestoreTty(TtyToken),
    PostSuspendHooks,
    TeardownEnvironment,
    RestartServices(Vec<ServiceRecord>),
    EnableBarriers(Vec<BarrierRecord>),
    StopDeviceDaemon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Tty,
    PostSuspendHooks,
    Environment,
    Services,
    Barriers,
    DeviceDaemon,
}

impl Release {
    pub fn kind(&self) -> ReleaseKind {
        match self {
            Self::RestoreTty(_) => ReleaseKind::Tty,
            Self::PostSuspendHooks => ReleaseKind::PostSuspendHooks,
            Self::TeardownEnvironment => ReleaseKind::Environment,
            Self::RestartServices(_) => ReleaseKind::Services,
            Self::EnableBarriers(_) => ReleaseKind::Barriers,
            Self::StopDeviceDaemon => ReleaseKind::DeviceDaemon,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::RestoreTty(_) => "restoring terminal",
            Self::PostSuspendHooks => "running post-suspend hooks",
            Self::TeardownEnvironment => "unmounting resume environment",
            Self::RestartServices(_) => "starting previously stopped services",
            Self::EnableBarriers(_) => "re-enabling write barriers",
            Self::StopDeviceDaemon => "stopping device-event daemon",
        }
    }

    pub fn run<H: SuspendHost + ?Sized>(self, host: &mut H) -> Result<(), SuspendError> {
        debug!("{}", self.describe());
        match self {
            Self::RestoreTty(token) => host.restore_tty(token),
            Self::PostSuspendHooks => host.run_sleep_hooks(HookPhase::Post),
            Self::TeardownEnvironment => host.teardown_environment(),
            Self::RestartServices(services) => host.start_services(&services),
            Self::EnableBarriers(filesystems) => host.enable_barriers(&filesystems),
            Self::StopDeviceDaemon => host.stop_device_daemon(),
        }
    }
}

/// Releases in acquisition order; unwound back to front.
#[derive(Debug, Default)]
pub struct CleanupStack {
    guards: Vec<Release>,
}

impl CleanupStack {
    pub fn push(&mut self, release: Release) {
        self.guards.push(release);
    }

    /// Remove the most recent release of `kind` so it can run ahead of the
    /// unwind, along with the slot it occupied.
    pub fn take(&mut self, kind: ReleaseKind) -> Option<(usize, Release)> {
        let slot = self.guards.iter().rposition(|guard| guard.kind() == kind)?;
        Some((slot, self.guards.remove(slot)))
    }

    /// Put a taken release back where it was, so the unwind runs it in its
    /// original order.
    pub fn reinstate(&mut self, slot: usize, release: Release) {
        let slot = slot.min(self.guards.len());
        self.guards.insert(slot, release);
    }

    pub fn pending(&self) -> impl Iterator<Item = ReleaseKind> + '_ {
        self.guards.iter().map(Release::kind)
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Run every release, newest first. A failing release does not stop the
    /// ones after it; failures are returned in the order they happened.
    pub fn unwind<H: SuspendHost + ?Sized>(&mut self, host: &mut H) -> Vec<SuspendError> {
        let mut failures = Vec::new();
        while let Some(release) = self.guards.pop() {
            let what = release.describe();
            if let Err(error) = release.run(host) {
                warn!("{what} failed: {error}");
                failures.push(error.context(what));
            }
        }
        failures
    }
}

impl Drop for CleanupStack {
    fn drop(&mut self) {
        if !self.guards.is_empty() {
            warn!(
                "{} release(s) dropped without running: {:?}",
                self.guards.len(),
                self.guards.iter().map(Release::kind).collect::<Vec<_>>()
            );
        }
    }
}
