// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File system locations the host implementation works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostPaths {
    /// Root of the unpacked initramfs used as resume environment
    pub initramfs_dir: PathBuf,

    /// Resume binary, relative to `initramfs_dir`
    pub resume_binary: PathBuf,

    pub sleep_hook_dir: PathBuf,
    pub crypttab: PathBuf,
    pub cryptsetup: PathBuf,

    /// Where key-file devices are mounted while they are read
    pub key_mount_dir: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            initramfs_dir: PathBuf::from("/run/initramfs"),
            resume_binary: PathBuf::from("suspend"),
            sleep_hook_dir: PathBuf::from("/usr/lib/systemd/system-sleep"),
            crypttab: PathBuf::from("/etc/crypttab"),
            cryptsetup: PathBuf::from("/usr/bin/cryptsetup"),
            key_mount_dir: PathBuf::from("/run/luks-suspend/key"),
        }
    }
}

impl HostPaths {
    /// Resume binary as seen from outside the environment.
    pub fn resume_binary_on_host(&self) -> PathBuf {
        let relative = self
            .resume_binary
            .strip_prefix("/")
            .unwrap_or(&self.resume_binary);
        self.initramfs_dir.join(relative)
    }

    /// Resume binary as seen from inside the environment.
    pub fn resume_binary_in_chroot(&self) -> PathBuf {
        PathBuf::from("/").join(&self.resume_binary)
    }
}
