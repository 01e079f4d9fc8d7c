// SPDX-License-Identifier: GPL-3.0-only

//! initramfs-suspend: the resume-environment half of luks-suspend
//!
//! Started by luks-suspend inside the initramfs chroot with the volume
//! registry on a pipe. Locks every volume, suspends, and returns success
//! only once the root volume is unlocked again.

use std::fs::File;
use std::os::fd::FromRawFd;

use anyhow::{Result, bail};
use clap::Parser;
use luks_suspend::cli::ResumeCli;
use luks_suspend::{logging, require_root};
use suspend_contracts::SuspendError;
use suspend_core::{SessionOptions, run_resume_environment};
use suspend_sys::LinuxHost;
use suspend_types::handoff;

fn main() -> Result<()> {
    let cli = ResumeCli::parse();
    logging::init(cli.debug, None);
    require_root("initramfs-suspend")?;

    if cli.state_fd < 0 {
        bail!("invalid state fd {}", cli.state_fd);
    }
    // SAFETY: the parent hands this descriptor to us alone; nothing else in
    // this process opens or closes it.
    let state = unsafe { File::from_raw_fd(cli.state_fd) };
    let registry = handoff::read_from(state).map_err(|error| {
        let error = SuspendError::from(error).context("reading volume registry");
        tracing::error!("{error}");
        error
    })?;
    tracing::debug!("received {} volume(s)", registry.len());

    // Paths come from luks-suspend; the host's config file is out of reach.
    let debug = cli.debug;
    let mut host = LinuxHost::new(cli.paths(), debug);
    run_resume_environment(&mut host, registry, &SessionOptions { debug })?;
    Ok(())
}
