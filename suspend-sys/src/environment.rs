// SPDX-License-Identifier: GPL-3.0-only

//! The initramfs resume environment: bind mounts and the chrooted child

use std::ffi::OsString;
use std::fs::{self, File};
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use nix::fcntl::OFlag;
use nix::mount::{MntFlags, MsFlags};
use suspend_types::{HostPaths, VolumeRegistry, handoff};
use tracing::{debug, warn};

use crate::error::{Result, SysError};

/// Host filesystems the resume environment needs, in mount order.
pub const BIND_MOUNTS: &[&str] = &["/sys", "/proc", "/dev", "/run"];

/// File descriptor the child reads the volume registry from.
pub const STATE_FD: i32 = 3;

#[derive(Debug)]
pub struct InitramfsChroot {
    dir: PathBuf,
    binary: PathBuf,
    forwarded: Vec<OsString>,
    mounted: Vec<PathBuf>,
}

impl InitramfsChroot {
    /// `binary` is the path inside `dir`.
    pub fn new(dir: impl Into<PathBuf>, binary: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            binary: binary.into(),
            forwarded: Vec::new(),
            mounted: Vec::new(),
        }
    }

    /// The environment for `paths`, passing on the paths the resume binary
    /// works with.
    pub fn for_paths(paths: &HostPaths) -> Self {
        Self {
            forwarded: forwarded_args(paths),
            ..Self::new(&paths.initramfs_dir, paths.resume_binary_in_chroot())
        }
    }

    /// Arguments the resume binary is started with, after the binary itself.
    pub fn child_args(&self, debug_mode: bool) -> Vec<OsString> {
        let mut args = Vec::new();
        if debug_mode {
            args.push(OsString::from("--debug"));
        }
        args.push(OsString::from("--state-fd"));
        args.push(OsString::from(STATE_FD.to_string()));
        args.extend(self.forwarded.iter().cloned());
        args
    }

    fn binary_on_host(&self) -> PathBuf {
        self.dir
            .join(self.binary.strip_prefix("/").unwrap_or(&self.binary))
    }

    /// The resume binary must be an executable regular file, and `chroot`
    /// must be on PATH.
    pub fn check(&self) -> Result<()> {
        let binary = self.binary_on_host();
        let metadata = fs::metadata(&binary).map_err(|error| SysError::InvalidFile {
            path: binary.clone(),
            reason: error.to_string(),
        })?;
        if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
            return Err(SysError::InvalidFile {
                path: binary,
                reason: "not an executable file".to_string(),
            });
        }

        which::which("chroot")
            .map_err(|error| SysError::OperationFailed(format!("chroot: {error}")))?;
        Ok(())
    }

    /// Bind every host filesystem in [`BIND_MOUNTS`]. A failure unmounts
    /// what was already mounted.
    pub fn prepare(&mut self) -> Result<()> {
        for (source, target) in BIND_MOUNTS.iter().zip(bind_targets(&self.dir)) {
            debug!("bind mounting {source} at {}", target.display());

            let mounted = fs::create_dir_all(&target)
                .map_err(SysError::from)
                .and_then(|()| {
                    nix::mount::mount(
                        Some(*source),
                        target.as_path(),
                        None::<&str>,
                        MsFlags::MS_BIND,
                        None::<&str>,
                    )
                    .map_err(SysError::from)
                });

            if let Err(error) = mounted {
                if let Err(rollback) = self.teardown() {
                    warn!("rolling back bind mounts: {rollback}");
                }
                return Err(error);
            }
            self.mounted.push(target);
        }
        Ok(())
    }

    /// Lazily unmount in reverse. Keeps going past failures and reports the
    /// first.
    pub fn teardown(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(target) = self.mounted.pop() {
            debug!("unmounting {}", target.display());
            if let Err(errno) = nix::mount::umount2(target.as_path(), MntFlags::MNT_DETACH) {
                warn!("unmounting {}: {errno}", target.display());
                first_error.get_or_insert(SysError::from(errno));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Run the resume binary in the chroot with `registry` on [`STATE_FD`],
    /// and wait for it. Its exit status is the outcome of lock, suspend and
    /// gate-volume resume.
    pub fn run(&self, registry: &VolumeRegistry, debug_mode: bool) -> Result<()> {
        let (reader, writer) = nix::unistd::pipe2(OFlag::O_CLOEXEC)?;

        let mut command = Command::new("chroot");
        command
            .arg(&self.dir)
            .arg(&self.binary)
            .args(self.child_args(debug_mode));

        let read_fd = reader.as_raw_fd();
        // SAFETY: only async-signal-safe calls between fork and exec.
        unsafe {
            command.pre_exec(move || install_state_fd(read_fd));
        }

        debug!("spawning {command:?}");
        let mut child = command.spawn()?;
        drop(reader);

        let written = send_registry(writer, registry);
        let status = child.wait()?;
        written?;

        if status.success() {
            Ok(())
        } else {
            Err(SysError::OperationFailed(format!(
                "resume environment exited with {status}"
            )))
        }
    }
}

fn send_registry(writer: OwnedFd, registry: &VolumeRegistry) -> Result<()> {
    handoff::write_to(File::from(writer), registry)
        .map_err(|error| SysError::OperationFailed(format!("handing over volumes: {error}")))
}

fn install_state_fd(read_fd: i32) -> std::io::Result<()> {
    if read_fd == STATE_FD {
        // dup2 onto itself keeps FD_CLOEXEC set.
        if unsafe { libc::fcntl(read_fd, libc::F_SETFD, 0) } == -1 {
            return Err(std::io::Error::last_os_error());
        }
    } else if unsafe { libc::dup2(read_fd, STATE_FD) } == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// The host's config file is not visible inside the chroot, so the paths
/// used there travel on the command line.
pub fn forwarded_args(paths: &HostPaths) -> Vec<OsString> {
    vec![
        OsString::from("--cryptsetup"),
        paths.cryptsetup.clone().into_os_string(),
        OsString::from("--key-mount-dir"),
        paths.key_mount_dir.clone().into_os_string(),
    ]
}

/// Where each of [`BIND_MOUNTS`] lands inside `dir`.
pub fn bind_targets(dir: &Path) -> Vec<PathBuf> {
    BIND_MOUNTS
        .iter()
        .map(|source| dir.join(source.trim_start_matches('/')))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_targets_live_under_the_chroot() {
        assert_eq!(
            bind_targets(Path::new("/run/initramfs")),
            vec![
                PathBuf::from("/run/initramfs/sys"),
                PathBuf::from("/run/initramfs/proc"),
                PathBuf::from("/run/initramfs/dev"),
                PathBuf::from("/run/initramfs/run"),
            ]
        );
    }

    #[test]
    fn check_rejects_missing_binary() {
        let chroot = InitramfsChroot::new("/nonexistent/initramfs", "/suspend");
        assert!(matches!(chroot.check(), Err(SysError::InvalidFile { .. })));
    }

    #[test]
    fn teardown_without_mounts_is_a_no_op() {
        let mut chroot = InitramfsChroot::new("/run/initramfs", "suspend");
        chroot.teardown().unwrap();
        assert_eq!(
            chroot.binary_on_host(),
            PathBuf::from("/run/initramfs/suspend")
        );
    }

    #[test]
    fn child_gets_configured_paths() {
        let paths = HostPaths {
            cryptsetup: PathBuf::from("/sbin/cryptsetup"),
            key_mount_dir: PathBuf::from("/run/keys"),
            ..HostPaths::default()
        };
        let chroot = InitramfsChroot::for_paths(&paths);
        assert_eq!(chroot.binary, PathBuf::from("/suspend"));
        assert_eq!(
            chroot.child_args(true),
            [
                "--debug",
                "--state-fd",
                "3",
                "--cryptsetup",
                "/sbin/cryptsetup",
                "--key-mount-dir",
                "/run/keys",
            ]
            .map(OsString::from)
        );
    }
}
