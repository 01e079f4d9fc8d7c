// SPDX-License-Identifier: GPL-3.0-only

//! Root key-file from the kernel command line (`cryptkey=`)

use std::fs;
use std::path::PathBuf;

use suspend_types::Keyfile;
use tracing::warn;

use crate::error::Result;

const DEVICE_TAGS: &[(&str, &str)] = &[
    ("UUID=", "/dev/disk/by-uuid"),
    ("LABEL=", "/dev/disk/by-label"),
    ("PARTUUID=", "/dev/disk/by-partuuid"),
    ("PARTLABEL=", "/dev/disk/by-partlabel"),
];

pub fn root_keyfile() -> Result<Option<Keyfile>> {
    let cmdline = fs::read_to_string("/proc/cmdline")?;
    Ok(parse_cryptkey(&cmdline))
}

/// Turn `UUID=...`, `LABEL=...`, `PARTUUID=...` or `PARTLABEL=...` into the
/// matching `/dev/disk/by-*` link; anything else is taken as a path.
pub fn resolve_device_spec(spec: &str) -> PathBuf {
    DEVICE_TAGS
        .iter()
        .find_map(|(tag, dir)| {
            spec.strip_prefix(tag)
                .map(|value| PathBuf::from(dir).join(value.trim_matches('"')))
        })
        .unwrap_or_else(|| PathBuf::from(spec))
}

/// The last `cryptkey=` wins, as with the kernel's own parameters.
///
/// `rootfs:PATH` is a file inside the resume environment. `DEVICE:FSTYPE:PATH`
/// is a file on a filesystem that has to be mounted first.
pub fn parse_cryptkey(cmdline: &str) -> Option<Keyfile> {
    let value = cmdline
        .split_whitespace()
        .filter_map(|param| param.strip_prefix("cryptkey="))
        .last()?;

    if let Some(path) = value.strip_prefix("rootfs:") {
        return non_empty(path).map(Keyfile::at);
    }

    // Split from the right: the device part may itself contain a colon.
    let mut parts = value.rsplitn(3, ':');
    let (Some(path), Some(fs_type), Some(device)) = (parts.next(), parts.next(), parts.next())
    else {
        warn!("ignoring unrecognised cryptkey={value}");
        return None;
    };

    if fs_type.parse::<u64>().is_ok() {
        // DEVICE:OFFSET:SIZE, raw key material on a block device
        warn!("raw-device cryptkey={value} is not supported");
        return None;
    }

    Some(Keyfile::on_device(
        resolve_device_spec(device),
        non_empty(fs_type).map(str::to_string),
        non_empty(path)?,
    ))
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}
