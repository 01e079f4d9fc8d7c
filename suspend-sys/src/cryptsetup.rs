// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use suspend_types::Keyfile;
use tracing::{debug, warn};

use crate::command::{run_command, run_with_stdin};
use crate::error::Result;

/// `cryptsetup luksSuspend` / `luksResume` for one binary.
#[derive(Debug, Clone)]
pub struct Cryptsetup {
    binary: PathBuf,
}

impl Cryptsetup {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn suspend(&self, name: &str) -> Result<()> {
        run_command(&self.binary, &["luksSuspend", name])?;
        Ok(())
    }

    /// cryptsetup reads the passphrase from stdin up to the newline.
    pub fn resume_with_passphrase(&self, name: &str, passphrase: &[u8]) -> Result<()> {
        run_with_stdin(
            &self.binary,
            &["--tries", "1", "luksResume", name],
            &[passphrase, b"\n".as_slice()],
        )?;
        Ok(())
    }

    pub fn resume_with_keyfile(&self, name: &str, key_path: &Path) -> Result<()> {
        let args = [
            OsStr::new("--key-file"),
            key_path.as_os_str(),
            OsStr::new("luksResume"),
            OsStr::new(name),
        ];
        run_command(&self.binary, &args)?;
        Ok(())
    }
}

/// A key-file device mounted read-only for the duration of one unlock.
#[derive(Debug)]
pub struct KeyMount {
    mount_point: PathBuf,
}

impl KeyMount {
    pub fn mount(device: &Path, fs_type: Option<&str>, mount_point: &Path) -> Result<Self> {
        fs::create_dir_all(mount_point)?;

        let mut args = vec![OsStr::new("-o"), OsStr::new("ro")];
        if let Some(fs_type) = fs_type {
            args.extend([OsStr::new("-t"), OsStr::new(fs_type)]);
        }
        args.extend([device.as_os_str(), mount_point.as_os_str()]);
        run_command("mount", &args)?;

        debug!("mounted {} at {}", device.display(), mount_point.display());
        Ok(Self {
            mount_point: mount_point.to_path_buf(),
        })
    }

    pub fn join(&self, path: &Path) -> PathBuf {
        self.mount_point
            .join(path.strip_prefix("/").unwrap_or(path))
    }
}

impl Drop for KeyMount {
    fn drop(&mut self) {
        if let Err(error) = run_command("umount", &[self.mount_point.as_os_str()]) {
            warn!("unmounting {}: {error}", self.mount_point.display());
        }
    }
}

/// Unlock `name` with `keyfile`, mounting its device under `mount_point`
/// first when it has one.
pub fn resume_with_keyfile(
    cryptsetup: &Cryptsetup,
    name: &str,
    keyfile: &Keyfile,
    mount_point: &Path,
) -> Result<()> {
    match &keyfile.device {
        Some(device) => {
            let mount = KeyMount::mount(device, keyfile.fs_type.as_deref(), mount_point)?;
            cryptsetup.resume_with_keyfile(name, &mount.join(&keyfile.path))
        }
        None => cryptsetup.resume_with_keyfile(name, &keyfile.path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_paths_resolve_inside_the_mount() {
        let mount = std::mem::ManuallyDrop::new(KeyMount {
            mount_point: PathBuf::from("/run/luks-suspend/key"),
        });
        assert_eq!(
            mount.join(Path::new("/keys/root.bin")),
            PathBuf::from("/run/luks-suspend/key/keys/root.bin")
        );
        assert_eq!(
            mount.join(Path::new("root.bin")),
            PathBuf::from("/run/luks-suspend/key/root.bin")
        );
    }
}
