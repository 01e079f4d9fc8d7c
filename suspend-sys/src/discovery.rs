// SPDX-License-Identifier: GPL-3.0-only

//! Unlocked LUKS volumes from sysfs
//!
//! A device-mapper device is a dm-crypt volume when its `dm/uuid` starts
//! with `CRYPT-`. The root volume is the one found by walking `slaves/` down
//! from the device that backs `/`.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use suspend_types::Volume;
use tracing::debug;

use crate::error::Result;

const CRYPT_UUID_PREFIX: &str = "CRYPT-";

#[derive(Debug, Clone)]
pub struct SysfsBlock {
    /// Usually `/sys`
    root: PathBuf,
}

impl Default for SysfsBlock {
    fn default() -> Self {
        Self::new("/sys")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CryptDevice {
    kernel_name: String,
    name: String,
    minor: u32,
}

impl SysfsBlock {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Encrypted volumes in dm minor order. `root_dev` is `(major, minor)`
    /// of the device backing `/`, if known.
    pub fn crypt_volumes(&self, root_dev: Option<(u64, u64)>) -> Result<Vec<Volume>> {
        let devices = self.crypt_devices()?;
        let root_name = match root_dev {
            Some((major, minor)) => self.crypt_ancestor(
                &self.root.join(format!("dev/block/{major}:{minor}")),
                &devices,
            ),
            None => None,
        };
        debug!("root volume: {root_name:?}");

        Ok(devices
            .into_iter()
            .map(|device| {
                let is_root = root_name.as_deref() == Some(device.kernel_name.as_str());
                Volume::new(device.name, is_root)
            })
            .collect())
    }

    fn crypt_devices(&self) -> Result<Vec<CryptDevice>> {
        let mut devices = Vec::new();
        for entry in fs::read_dir(self.root.join("block"))? {
            let entry = entry?;
            let kernel_name = entry.file_name().to_string_lossy().into_owned();
            if !kernel_name.starts_with("dm-") {
                continue;
            }

            let dir = entry.path();
            let Some(uuid) = read_attr(&dir.join("dm/uuid")) else {
                continue;
            };
            if !is_crypt_uuid(&uuid) {
                continue;
            }
            let (Some(name), Some(minor)) = (
                read_attr(&dir.join("dm/name")),
                read_attr(&dir.join("dev")).and_then(|dev| parse_dev_number(&dev)),
            ) else {
                continue;
            };

            devices.push(CryptDevice {
                kernel_name,
                name,
                minor: minor.1,
            });
        }
        devices.sort_by_key(|device| device.minor);
        Ok(devices)
    }

    /// Depth-first walk of `slaves/` until a crypt device is reached.
    fn crypt_ancestor(&self, device: &Path, crypt: &[CryptDevice]) -> Option<String> {
        let resolved = fs::canonicalize(device).ok()?;
        let kernel_name = resolved.file_name()?.to_string_lossy().into_owned();
        if crypt.iter().any(|device| device.kernel_name == kernel_name) {
            return Some(kernel_name);
        }

        // A partition's parent directory is the whole disk.
        let mut candidates = vec![resolved.join("slaves")];
        if resolved.join("partition").exists() {
            if let Some(parent) = resolved.parent() {
                candidates.push(parent.join("slaves"));
            }
        }

        candidates
            .iter()
            .filter_map(|slaves| fs::read_dir(slaves).ok())
            .flatten()
            .filter_map(|entry| entry.ok())
            .find_map(|entry| self.crypt_ancestor(&entry.path(), crypt))
    }
}

/// `(major, minor)` of the filesystem containing `path`.
pub fn backing_device(path: &Path) -> Result<(u64, u64)> {
    let dev = fs::metadata(path)?.dev();
    Ok((nix::sys::stat::major(dev), nix::sys::stat::minor(dev)))
}

pub fn is_crypt_uuid(uuid: &str) -> bool {
    uuid.starts_with(CRYPT_UUID_PREFIX)
}

/// `"254:3"` from a sysfs `dev` attribute.
pub fn parse_dev_number(value: &str) -> Option<(u32, u32)> {
    let (major, minor) = value.trim().split_once(':')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn read_attr(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
