// SPDX-License-Identifier: GPL-3.0-only

//! Run state of one suspend/resume cycle
//!
//! A [`Session`] starts in [`Phase::Strict`], where any failure aborts the
//! cycle, and moves to [`Phase::Lenient`] exactly once, where failures are
//! logged and skipped. Every acquired resource registers its [`Release`] on
//! the session's cleanup stack; [`Session::finish`] unwinds that stack on
//! every exit path.

mod cleanup;

pub use cleanup::{CleanupStack, Release, ReleaseKind};

use std::fmt;

use suspend_contracts::{SuspendError, SuspendHost};
use suspend_types::VolumeRegistry;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Strict,
    Lenient,
}

/// Why the session stopped treating failures as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Nothing is encrypted, so nothing can be exposed
    NoVolumes,
    /// The gate volume is unlocked and the user has their root back
    GateUnlocked,
}

#[derive(Debug)]
pub struct Session {
    registry: VolumeRegistry,
    phase: Phase,
    cleanup: CleanupStack,
}

impl Session {
    pub fn new(registry: VolumeRegistry) -> Self {
        Self {
            registry,
            phase: Phase::Strict,
            cleanup: CleanupStack::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &VolumeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut VolumeRegistry {
        &mut self.registry
    }

    pub fn escalate(&mut self, reason: Escalation) {
        match self.phase {
            Phase::Strict => {
                info!("errors are no longer fatal ({reason:?})");
                self.phase = Phase::Lenient;
            }
            Phase::Lenient => debug!("already lenient, ignoring {reason:?}"),
        }
    }

    /// Apply the phase policy to the outcome of one step.
    ///
    /// Strict: the error comes back for `?`. Lenient: it is logged and the
    /// step yields `None`.
    pub fn attempt<T>(
        &self,
        what: impl fmt::Display,
        result: Result<T, SuspendError>,
    ) -> Result<Option<T>, SuspendError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(error) => match self.phase {
                Phase::Strict => Err(error.context(what)),
                Phase::Lenient => {
                    warn!("{what}: {error}");
                    Ok(None)
                }
            },
        }
    }

    pub fn acquire(&mut self, release: Release) {
        debug!("acquired: {:?}", release.kind());
        self.cleanup.push(release);
    }

    pub fn pending_releases(&self) -> Vec<ReleaseKind> {
        self.cleanup.pending().collect()
    }

    /// Run one release now instead of at the end, under the phase policy.
    ///
    /// If it fails while strict, the release goes back on the stack so the
    /// unwind tries it again.
    pub fn release_early<H: SuspendHost + ?Sized>(
        &mut self,
        host: &mut H,
        kind: ReleaseKind,
    ) -> Result<(), SuspendError> {
        let Some((slot, release)) = self.cleanup.take(kind) else {
            return Ok(());
        };
        let what = release.describe();
        let retry = release.clone();
        if let Err(error) = self.attempt(what, release.run(host)) {
            self.cleanup.reinstate(slot, retry);
            return Err(error);
        }
        Ok(())
    }

    /// Unwind every pending release and settle the cycle's result.
    ///
    /// An error from the steps wins. Otherwise a failed release is an error
    /// only while still strict.
    pub fn finish<H: SuspendHost + ?Sized>(
        mut self,
        host: &mut H,
        result: Result<(), SuspendError>,
    ) -> Result<(), SuspendError> {
        if let Err(fatal) = &result {
            error!("{fatal}");
            if !self.cleanup.is_empty() {
                info!("cleaning up before exit");
            }
        }

        let failures = self.cleanup.unwind(host);
        result?;

        match (self.phase, failures.into_iter().next()) {
            (Phase::Strict, Some(failure)) => Err(failure),
            _ => Ok(()),
        }
    }
}
