// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use suspend_contracts::{
    Console, CryptOps, FilesystemOps, PowerOps, ResumeEnvironment, ServiceOps, SuspendError,
    SuspendErrorKind, VolumeDiscovery,
};
use suspend_types::{
    BarrierRecord, HookPhase, HostPaths, Keyfile, ServiceRecord, TtyMode, TtyToken, Volume,
    VolumeRegistry,
};
use tracing::{debug, warn};

use crate::cryptsetup::{self, Cryptsetup};
use crate::discovery::{SysfsBlock, backing_device};
use crate::environment::InitramfsChroot;
use crate::error::SysError;
use crate::tty::Terminal;
use crate::{cmdline, crypttab, mounts, power, systemd};

const DEBUG_SHELL: &str = "/bin/sh";

/// The running Linux system.
#[derive(Debug)]
pub struct LinuxHost {
    paths: HostPaths,
    debug: bool,
    cryptsetup: Cryptsetup,
    sysfs: SysfsBlock,
    chroot: InitramfsChroot,
    terminal: Terminal,
}

impl LinuxHost {
    pub fn new(paths: HostPaths, debug: bool) -> Self {
        Self {
            cryptsetup: Cryptsetup::new(&paths.cryptsetup),
            sysfs: SysfsBlock::default(),
            chroot: InitramfsChroot::for_paths(&paths),
            terminal: Terminal::default(),
            paths,
            debug,
        }
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }
}

fn volume_op(error: SysError) -> SuspendError {
    error.into_suspend(SuspendErrorKind::VolumeOp)
}

fn environment(error: SysError) -> SuspendError {
    error.into_suspend(SuspendErrorKind::Environment)
}

fn config(error: SysError) -> SuspendError {
    error.into_suspend(SuspendErrorKind::Config)
}

impl VolumeDiscovery for LinuxHost {
    fn discover_volumes(&mut self) -> Result<Vec<Volume>, SuspendError> {
        let root_dev = match backing_device(Path::new("/")) {
            Ok(dev) => Some(dev),
            Err(error) => {
                warn!("cannot stat /: {error}");
                None
            }
        };
        let mut volumes = self.sysfs.crypt_volumes(root_dev).map_err(config)?;

        if let Some(root) = volumes.iter_mut().find(|volume| volume.is_root) {
            root.keyfile = cmdline::root_keyfile().map_err(config)?;
        }
        Ok(volumes)
    }

    fn crypttab_keyfiles(&mut self) -> Result<BTreeMap<String, Keyfile>, SuspendError> {
        crypttab::read_crypttab(&self.paths.crypttab).map_err(config)
    }
}

impl CryptOps for LinuxHost {
    fn lock_volume(&mut self, volume: &Volume) -> Result<(), SuspendError> {
        self.cryptsetup.suspend(&volume.name).map_err(volume_op)
    }

    fn unlock_with_keyfile(
        &mut self,
        volume: &Volume,
        keyfile: &Keyfile,
    ) -> Result<(), SuspendError> {
        cryptsetup::resume_with_keyfile(
            &self.cryptsetup,
            &volume.name,
            keyfile,
            &self.paths.key_mount_dir,
        )
        .map_err(volume_op)
    }

    fn unlock_with_passphrase(
        &mut self,
        volume: &Volume,
        passphrase: &[u8],
    ) -> Result<(), SuspendError> {
        self.cryptsetup
            .resume_with_passphrase(&volume.name, passphrase)
            .map_err(volume_op)
    }

    fn keyfile_available(&mut self, keyfile: &Keyfile) -> bool {
        let available = keyfile.probe_path().exists();
        debug!("{} available: {available}", keyfile.probe_path().display());
        available
    }
}

impl ServiceOps for LinuxHost {
    fn stop_services(&mut self, names: &[&str]) -> Result<Vec<ServiceRecord>, SuspendError> {
        Ok(systemd::stop_units(names)?)
    }

    fn start_services(&mut self, services: &[ServiceRecord]) -> Result<(), SuspendError> {
        Ok(systemd::start_units(services)?)
    }

    fn start_device_daemon(&mut self) -> Result<(), SuspendError> {
        systemd::start_udevd().map_err(environment)
    }

    fn stop_device_daemon(&mut self) -> Result<(), SuspendError> {
        systemd::stop_udevd().map_err(environment)
    }
}

impl FilesystemOps for LinuxHost {
    fn barrier_inventory(&mut self) -> Result<Vec<BarrierRecord>, SuspendError> {
        Ok(mounts::barrier_inventory()?)
    }

    fn disable_barriers(&mut self, filesystems: &[BarrierRecord]) -> Result<(), SuspendError> {
        Ok(mounts::disable_barriers(filesystems)?)
    }

    fn enable_barriers(&mut self, filesystems: &[BarrierRecord]) -> Result<(), SuspendError> {
        Ok(mounts::enable_barriers(filesystems)?)
    }

    fn sync(&mut self) -> Result<(), SuspendError> {
        nix::unistd::sync();
        Ok(())
    }
}

impl PowerOps for LinuxHost {
    fn suspend_to_ram(&mut self) -> Result<(), SuspendError> {
        Ok(power::suspend_to_ram()?)
    }

    fn run_sleep_hooks(&mut self, phase: HookPhase) -> Result<(), SuspendError> {
        Ok(power::run_sleep_hooks(&self.paths.sleep_hook_dir, phase)?)
    }
}

impl ResumeEnvironment for LinuxHost {
    fn check_environment(&mut self) -> Result<(), SuspendError> {
        self.chroot.check().map_err(environment)
    }

    fn prepare_environment(&mut self) -> Result<(), SuspendError> {
        self.chroot.prepare().map_err(environment)
    }

    fn teardown_environment(&mut self) -> Result<(), SuspendError> {
        self.chroot.teardown().map_err(environment)
    }

    fn suspend_in_environment(&mut self, registry: &VolumeRegistry) -> Result<(), SuspendError> {
        self.chroot.run(registry, self.debug).map_err(environment)
    }
}

impl Console for LinuxHost {
    fn alter_tty(&mut self, mode: TtyMode) -> Result<TtyToken, SuspendError> {
        Ok(self.terminal.alter(mode)?)
    }

    fn restore_tty(&mut self, token: TtyToken) -> Result<(), SuspendError> {
        Ok(self.terminal.restore(token)?)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, SuspendError> {
        Ok(self.terminal.read_byte()?)
    }

    fn write_text(&mut self, text: &str) -> Result<(), SuspendError> {
        Ok(self.terminal.write_text(text)?)
    }

    fn debug_shell(&mut self) -> Result<(), SuspendError> {
        debug!("starting {DEBUG_SHELL}");
        let status = Command::new(DEBUG_SHELL).status().map_err(SysError::from)?;
        if !status.success() {
            debug!("debug shell exited with {status}");
        }
        Ok(())
    }
}
