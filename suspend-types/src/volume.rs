// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One encrypted block device, identified by its device-mapper name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Volume {
    /// Device-mapper name (e.g., "cryptroot")
    pub name: String,

    /// True for the volume backing the root filesystem
    pub is_root: bool,

    /// Non-interactive unlock credential, if one is configured
    #[serde(default)]
    pub keyfile: Option<Keyfile>,
}

impl Volume {
    pub fn new(name: impl Into<String>, is_root: bool) -> Self {
        Self {
            name: name.into(),
            is_root,
            keyfile: None,
        }
    }

    pub fn with_keyfile(mut self, keyfile: Keyfile) -> Self {
        self.keyfile = Some(keyfile);
        self
    }

    pub fn has_keyfile(&self) -> bool {
        self.keyfile.is_some()
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root {
            write!(f, "{} (root)", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// A key-file reference.
///
/// When `device` is set the key lives on a separate block device (removable
/// media, typically) that has to be mounted first, and `path` is relative to
/// that filesystem. Otherwise `path` is an absolute path on an already
/// mounted filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keyfile {
    pub path: PathBuf,

    #[serde(default)]
    pub device: Option<PathBuf>,

    #[serde(default)]
    pub fs_type: Option<String>,
}

impl Keyfile {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            device: None,
            fs_type: None,
        }
    }

    pub fn on_device(
        device: impl Into<PathBuf>,
        fs_type: Option<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            path: path.into(),
            device: Some(device.into()),
            fs_type,
        }
    }

    /// The node whose existence decides availability.
    pub fn probe_path(&self) -> &Path {
        self.device.as_deref().unwrap_or(&self.path)
    }
}

/// Availability of a volume's key-file at the moment of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyfileState {
    Undefined,
    Unavailable,
    Available,
}

impl KeyfileState {
    pub fn of(keyfile: Option<&Keyfile>, is_available: impl FnOnce(&Keyfile) -> bool) -> Self {
        match keyfile {
            None => Self::Undefined,
            Some(keyfile) if is_available(keyfile) => Self::Available,
            Some(_) => Self::Unavailable,
        }
    }

    pub fn is_defined(self) -> bool {
        self != Self::Undefined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyfile_state_rechecks_availability() {
        let keyfile = Keyfile::on_device("/dev/disk/by-uuid/1234", Some("vfat".into()), "key.bin");

        assert_eq!(KeyfileState::of(None, |_| true), KeyfileState::Undefined);
        assert_eq!(
            KeyfileState::of(Some(&keyfile), |_| false),
            KeyfileState::Unavailable
        );
        assert_eq!(
            KeyfileState::of(Some(&keyfile), |k| k.probe_path()
                == Path::new("/dev/disk/by-uuid/1234")),
            KeyfileState::Available
        );
    }

    #[test]
    fn display_marks_root() {
        assert_eq!(Volume::new("cryptroot", true).to_string(), "cryptroot (root)");
        assert_eq!(Volume::new("crypthome", false).to_string(), "crypthome");
    }
}
