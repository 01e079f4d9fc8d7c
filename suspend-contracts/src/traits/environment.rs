// SPDX-License-Identifier: GPL-3.0-only

use suspend_types::VolumeRegistry;

use crate::SuspendError;

/// The restricted root entered for locking, sleeping and root unlock.
pub trait ResumeEnvironment {
    /// Fail early if the environment cannot be entered at all.
    fn check_environment(&mut self) -> Result<(), SuspendError>;

    /// Either everything is mounted, or nothing is.
    fn prepare_environment(&mut self) -> Result<(), SuspendError>;

    fn teardown_environment(&mut self) -> Result<(), SuspendError>;

    /// Hand the registry over and run lock, suspend and gate-volume resume
    /// inside the environment. Success means the gate volume is unlocked.
    fn suspend_in_environment(&mut self, registry: &VolumeRegistry) -> Result<(), SuspendError>;
}
