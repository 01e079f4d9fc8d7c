// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::{OsStr, OsString};
use std::fs;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};

use suspend_types::BarrierRecord;
use tracing::{debug, warn};

use crate::command::run_command;
use crate::error::{Result, SysError};

const BARRIER_FS_TYPES: &[&str] = &["ext3", "ext4"];

pub fn barrier_inventory() -> Result<Vec<BarrierRecord>> {
    let mount_info = fs::read_to_string("/proc/self/mountinfo")?;
    parse_barrier_filesystems(&mount_info)
}

/// ext3/ext4 mounts from mountinfo, with whether their write barrier is on.
pub fn parse_barrier_filesystems(input: &str) -> Result<Vec<BarrierRecord>> {
    let mut filesystems = Vec::new();

    for line in input.lines().filter(|line| !line.trim().is_empty()) {
        let invalid = || SysError::InvalidFile {
            path: PathBuf::from("/proc/self/mountinfo"),
            reason: format!("invalid line: {line}"),
        };

        let (left, right) = line.split_once(" - ").ok_or_else(invalid)?;

        let mut left_fields = left.split_whitespace();
        let mount_point = left_fields.nth(4).ok_or_else(invalid)?;
        let mount_options = left_fields.next().ok_or_else(invalid)?;

        let mut right_fields = right.split_whitespace();
        let fs_type = right_fields.next().ok_or_else(invalid)?;
        let super_options = right_fields.nth(1).unwrap_or("");

        if !BARRIER_FS_TYPES.contains(&fs_type) {
            continue;
        }

        let disabled = mount_options
            .split(',')
            .chain(super_options.split(','))
            .any(|option| option == "nobarrier" || option == "barrier=0");

        filesystems.push(BarrierRecord {
            mount_point: unescape_mount_field(mount_point),
            fs_type: fs_type.to_string(),
            had_barrier_enabled: !disabled,
        });
    }

    Ok(filesystems)
}

/// Undo the kernel's `\ooo` octal escapes. Other bytes, including UTF-8
/// sequences, are kept as they are.
fn unescape_mount_field(value: &str) -> PathBuf {
    let bytes = value.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if let Some(byte) = octal_escape(&bytes[index..]) {
            output.push(byte);
            index += 4;
        } else {
            output.push(bytes[index]);
            index += 1;
        }
    }

    PathBuf::from(OsString::from_vec(output))
}

fn octal_escape(bytes: &[u8]) -> Option<u8> {
    let [b'\\', digits @ ..] = bytes.get(..4)? else {
        return None;
    };
    digits.iter().try_fold(0u8, |value, digit| match digit {
        b'0'..=b'7' => value.checked_mul(8)?.checked_add(digit - b'0'),
        _ => None,
    })
}

fn remount_barrier(mount_point: &Path, enabled: bool) -> Result<()> {
    let options = if enabled {
        "remount,barrier"
    } else {
        "remount,nobarrier"
    };
    let args = [
        OsStr::new("-i"),
        OsStr::new("-o"),
        OsStr::new(options),
        mount_point.as_os_str(),
    ];
    run_command("mount", &args)?;
    Ok(())
}

/// Disable every enabled barrier. On failure the ones already disabled are
/// turned back on before the error is returned.
pub fn disable_barriers(filesystems: &[BarrierRecord]) -> Result<()> {
    let mut disabled: Vec<&Path> = Vec::new();

    for fs in filesystems.iter().filter(|fs| fs.had_barrier_enabled) {
        debug!("disabling write barrier on {}", fs.mount_point.display());
        if let Err(error) = remount_barrier(&fs.mount_point, false) {
            for mount_point in disabled.iter().rev() {
                if let Err(rollback) = remount_barrier(mount_point, true) {
                    warn!("re-enabling barrier on {}: {rollback}", mount_point.display());
                }
            }
            return Err(error);
        }
        disabled.push(&fs.mount_point);
    }

    Ok(())
}

/// Re-enable barriers that were on before. Keeps going past failures and
/// reports the first.
pub fn enable_barriers(filesystems: &[BarrierRecord]) -> Result<()> {
    let mut first_error = None;

    for fs in filesystems.iter().filter(|fs| fs.had_barrier_enabled) {
        debug!("re-enabling write barrier on {}", fs.mount_point.display());
        if let Err(error) = remount_barrier(&fs.mount_point, true) {
            warn!("{}: {error}", fs.mount_point.display());
            first_error.get_or_insert(error);
        }
    }

    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::parse_barrier_filesystems;
    use std::path::PathBuf;

    #[test]
    fn parses_ext_mounts_and_barrier_state() {
        let sample = "\
36 25 254:1 / / rw,relatime - ext4 /dev/mapper/cryptroot rw\n\
37 25 0:5 / /proc rw,nosuid,nodev,noexec,relatime - proc proc rw\n\
38 36 254:2 / /home rw,relatime - ext4 /dev/mapper/crypthome rw,nobarrier\n\
39 36 254:3 / /srv/old\\040data rw,relatime - ext3 /dev/mapper/old rw,barrier=0\n\
40 36 254:4 / /var rw,relatime - xfs /dev/mapper/var rw\n\
41 36 254:5 / /mnt/usb\\040key rw,relatime - ext3 /dev/sdb1 rw,data=ordered\n";

        let filesystems = parse_barrier_filesystems(sample).expect("parse should succeed");
        let summary: Vec<(PathBuf, bool)> = filesystems
            .iter()
            .map(|fs| (fs.mount_point.clone(), fs.had_barrier_enabled))
            .collect();
        assert_eq!(
            summary,
            vec![
                (PathBuf::from("/"), true),
                (PathBuf::from("/home"), false),
                (PathBuf::from("/srv/old data"), false),
                (PathBuf::from("/mnt/usb key"), true),
            ]
        );
        assert_eq!(filesystems[3].fs_type, "ext3");
    }

    #[test]
    fn keeps_utf8_mount_points_intact() {
        let sample = "\
42 36 254:6 / /mnt/données rw,relatime - ext4 /dev/mapper/data rw\n\
43 36 254:7 / /mnt/日本\\040語 rw,relatime - ext4 /dev/mapper/jp rw\n";

        let filesystems = parse_barrier_filesystems(sample).expect("parse should succeed");
        let mount_points: Vec<PathBuf> =
            filesystems.iter().map(|fs| fs.mount_point.clone()).collect();
        assert_eq!(
            mount_points,
            vec![
                PathBuf::from("/mnt/données"),
                PathBuf::from("/mnt/日本 語"),
            ]
        );
    }

    #[test]
    fn malformed_escapes_are_kept_literally() {
        let sample = "44 36 254:8 / /mnt/a\\9xy\\134b rw - ext4 /dev/sdc1 rw\n";
        let filesystems = parse_barrier_filesystems(sample).expect("parse should succeed");
        assert_eq!(filesystems[0].mount_point, PathBuf::from("/mnt/a\\9xy\\b"));
    }

    #[test]
    fn rejects_lines_without_separator() {
        assert!(parse_barrier_filesystems("36 25 254:1 / / rw,relatime ext4\n").is_err());
    }
}
