// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Units stopped for the duration of the suspend.
///
/// journald may write to the root device and udevd often reads from it;
/// either one blocks forever once the root volume is locked.
pub const SUSPEND_SERVICES: &[&str] = &[
    "syslog.socket",
    "systemd-journald.socket",
    "systemd-journald-dev-log.socket",
    "systemd-journald-audit.socket",
    "systemd-journald.service",
    "systemd-udevd-control.socket",
    "systemd-udevd-kernel.socket",
    "systemd-udevd.service",
];

/// A mounted filesystem whose write barrier is toggled around the suspend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierRecord {
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub had_barrier_enabled: bool,
}

/// A unit stopped before the suspend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub was_active: bool,
}

/// Argument passed to system sleep hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Pre,
    Post,
}

impl HookPhase {
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}
