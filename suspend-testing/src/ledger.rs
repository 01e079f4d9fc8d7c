// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use suspend_types::{HookPhase, TtyMode, TtyToken};

/// One host call, with the arguments that matter for ordering checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AlterTty(TtyMode),
    RestoreTty(TtyToken),
    DebugShell,
    CheckEnvironment,
    PrepareEnvironment,
    TeardownEnvironment,
    SuspendInEnvironment(Vec<String>),
    DiscoverVolumes,
    CrypttabKeyfiles,
    Lock(String),
    UnlockKeyfile(String),
    UnlockPassphrase(String),
    StopServices(Vec<String>),
    StartServices(Vec<String>),
    StartDeviceDaemon,
    StopDeviceDaemon,
    BarrierInventory,
    DisableBarriers(Vec<PathBuf>),
    EnableBarriers(Vec<PathBuf>),
    Sync,
    SuspendToRam,
    SleepHooks(HookPhase),
}

/// [`Call`] without its arguments, for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    AlterTty,
    RestoreTty,
    DebugShell,
    CheckEnvironment,
    PrepareEnvironment,
    TeardownEnvironment,
    SuspendInEnvironment,
    DiscoverVolumes,
    CrypttabKeyfiles,
    Lock,
    UnlockKeyfile,
    UnlockPassphrase,
    StopServices,
    StartServices,
    StartDeviceDaemon,
    StopDeviceDaemon,
    BarrierInventory,
    DisableBarriers,
    EnableBarriers,
    Sync,
    SuspendToRam,
    SleepHooks,
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::AlterTty(_) => CallKind::AlterTty,
            Self::RestoreTty(_) => CallKind::RestoreTty,
            Self::DebugShell => CallKind::DebugShell,
            Self::CheckEnvironment => CallKind::CheckEnvironment,
            Self::PrepareEnvironment => CallKind::PrepareEnvironment,
            Self::TeardownEnvironment => CallKind::TeardownEnvironment,
            Self::SuspendInEnvironment(_) => CallKind::SuspendInEnvironment,
            Self::DiscoverVolumes => CallKind::DiscoverVolumes,
            Self::CrypttabKeyfiles => CallKind::CrypttabKeyfiles,
            Self::Lock(_) => CallKind::Lock,
            Self::UnlockKeyfile(_) => CallKind::UnlockKeyfile,
            Self::UnlockPassphrase(_) => CallKind::UnlockPassphrase,
            Self::StopServices(_) => CallKind::StopServices,
            Self::StartServices(_) => CallKind::StartServices,
            Self::StartDeviceDaemon => CallKind::StartDeviceDaemon,
            Self::StopDeviceDaemon => CallKind::StopDeviceDaemon,
            Self::BarrierInventory => CallKind::BarrierInventory,
            Self::DisableBarriers(_) => CallKind::DisableBarriers,
            Self::EnableBarriers(_) => CallKind::EnableBarriers,
            Self::Sync => CallKind::Sync,
            Self::SuspendToRam => CallKind::SuspendToRam,
            Self::SleepHooks(_) => CallKind::SleepHooks,
        }
    }
}
