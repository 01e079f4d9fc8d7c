// SPDX-License-Identifier: GPL-3.0-only

//! luks-suspend: lock LUKS volumes across suspend-to-RAM
//!
//! Runs on the live system. Locking, the hardware suspend and unlocking the
//! root volume happen in initramfs-suspend inside the resume environment.

use anyhow::Result;
use clap::Parser;
use luks_suspend::cli::SuspendCli;
use luks_suspend::config::Config;
use luks_suspend::{logging, require_root};
use suspend_core::{SessionOptions, run_suspend};
use suspend_sys::LinuxHost;

fn main() -> Result<()> {
    let cli = SuspendCli::parse();
    let config = Config::load(&cli.config);

    let debug = cli.debug || config.as_ref().is_ok_and(|config| config.debug);
    let log_level = config
        .as_ref()
        .ok()
        .and_then(|config| config.log_level.as_deref());
    logging::init(debug, log_level);

    let config = config.inspect_err(|error| tracing::error!("{error}"))?;
    require_root("luks-suspend")?;
    tracing::info!("luks-suspend v{}", env!("CARGO_PKG_VERSION"));

    let mut host = LinuxHost::new(config.paths, debug);
    run_suspend(&mut host, &SessionOptions { debug })?;
    Ok(())
}
