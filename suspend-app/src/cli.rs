// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use clap::Parser;
use suspend_types::HostPaths;

use crate::config::DEFAULT_CONFIG_PATH;

/// Lock every unlocked LUKS volume, suspend to RAM, and unlock them again
#[derive(Parser, Debug)]
#[command(name = "luks-suspend", version)]
#[command(about = "Suspend to RAM with LUKS volumes locked", long_about = None)]
pub struct SuspendCli {
    /// Verbose output, and Ctrl-T at the passphrase prompt starts a shell
    #[arg(short, long)]
    pub debug: bool,

    /// Configuration file
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Resume-environment half of luks-suspend; not meant to be run by hand
#[derive(Parser, Debug)]
#[command(name = "initramfs-suspend", version)]
#[command(about = "Lock volumes, suspend, and unlock the root volume", long_about = None)]
pub struct ResumeCli {
    #[arg(short, long)]
    pub debug: bool,

    /// File descriptor carrying the volume registry
    #[arg(long, value_name = "FD", default_value_t = 3)]
    pub state_fd: i32,

    /// cryptsetup binary inside the resume environment
    #[arg(long, value_name = "PATH")]
    pub cryptsetup: Option<PathBuf>,

    /// Where key-file devices are mounted inside the resume environment
    #[arg(long, value_name = "PATH")]
    pub key_mount_dir: Option<PathBuf>,
}

impl ResumeCli {
    /// Defaults overridden by whatever luks-suspend passed on.
    pub fn paths(&self) -> HostPaths {
        let mut paths = HostPaths::default();
        if let Some(cryptsetup) = &self.cryptsetup {
            paths.cryptsetup.clone_from(cryptsetup);
        }
        if let Some(key_mount_dir) = &self.key_mount_dir {
            paths.key_mount_dir.clone_from(key_mount_dir);
        }
        paths
    }
}
