// SPDX-License-Identifier: GPL-3.0-only

use suspend_types::{BarrierRecord, HookPhase, ServiceRecord};

use crate::SuspendError;

pub trait ServiceOps {
    /// Stop the named units and report which of them were running.
    fn stop_services(&mut self, names: &[&str]) -> Result<Vec<ServiceRecord>, SuspendError>;

    /// Start the units that were running before they were stopped.
    fn start_services(&mut self, services: &[ServiceRecord]) -> Result<(), SuspendError>;

    /// Device-event daemon inside the resume environment.
    fn start_device_daemon(&mut self) -> Result<(), SuspendError>;

    fn stop_device_daemon(&mut self) -> Result<(), SuspendError>;
}

pub trait FilesystemOps {
    fn barrier_inventory(&mut self) -> Result<Vec<BarrierRecord>, SuspendError>;

    /// Either every barrier in `filesystems` is disabled, or none is.
    fn disable_barriers(&mut self, filesystems: &[BarrierRecord]) -> Result<(), SuspendError>;

    fn enable_barriers(&mut self, filesystems: &[BarrierRecord]) -> Result<(), SuspendError>;

    /// Flush pending writes.
    fn sync(&mut self) -> Result<(), SuspendError>;
}

pub trait PowerOps {
    /// Enter suspend-to-RAM. Returns after the hardware resumes.
    fn suspend_to_ram(&mut self) -> Result<(), SuspendError>;

    fn run_sleep_hooks(&mut self, phase: HookPhase) -> Result<(), SuspendError>;
}
