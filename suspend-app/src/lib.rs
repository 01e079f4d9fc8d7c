// SPDX-License-Identifier: GPL-3.0-only

//! Process setup shared by `luks-suspend` and `initramfs-suspend`

pub mod cli;
pub mod config;
pub mod logging;

/// Both binaries drive cryptsetup, mounts and the terminal directly.
pub fn require_root(program: &str) -> anyhow::Result<()> {
    if unsafe { libc::geteuid() } != 0 {
        tracing::error!("{program} must run as root");
        anyhow::bail!("{program} must run with root privileges");
    }
    Ok(())
}
