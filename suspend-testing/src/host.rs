// SPDX-License-Identifier: GPL-3.0-only

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

use suspend_contracts::{
    Console, CryptOps, FilesystemOps, PowerOps, ResumeEnvironment, ServiceOps, SuspendError,
    SuspendErrorKind, VolumeDiscovery,
};
use suspend_types::{
    BarrierRecord, HookPhase, Keyfile, ServiceRecord, TtyMode, TtyToken, Volume, VolumeRegistry,
};

use crate::ledger::{Call, CallKind};

/// In-memory host. Every trait call is appended to [`FakeHost::calls`]
/// before any injected failure fires, so failed attempts show up in the
/// ledger too.
#[derive(Debug, Default)]
pub struct FakeHost {
    pub calls: Vec<Call>,
    /// Everything written to the console
    pub output: String,
    /// Restores of a token that was never handed out or already restored
    pub double_restores: usize,

    volumes: Vec<Volume>,
    crypttab: BTreeMap<String, Keyfile>,
    passphrases: BTreeMap<String, Vec<u8>>,
    available: BTreeSet<PathBuf>,
    appearing: BTreeMap<PathBuf, usize>,
    active_services: BTreeSet<String>,
    filesystems: Vec<BarrierRecord>,
    input: VecDeque<u8>,
    failures: Vec<CallKind>,
    next_token: u32,
    open_ttys: BTreeSet<u32>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes returned by `read_byte`, then end of input.
    pub fn with_input(mut self, bytes: &[u8]) -> Self {
        self.input.extend(bytes.iter().copied());
        self
    }

    /// The only passphrase that unlocks `volume`.
    pub fn with_passphrase(mut self, volume: &str, passphrase: &[u8]) -> Self {
        self.passphrases.insert(volume.to_string(), passphrase.to_vec());
        self
    }

    pub fn with_volumes(mut self, volumes: Vec<Volume>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn with_crypttab(mut self, volume: &str, keyfile: Keyfile) -> Self {
        self.crypttab.insert(volume.to_string(), keyfile);
        self
    }

    pub fn with_active_services(mut self, names: &[&str]) -> Self {
        self.active_services
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn with_filesystems(mut self, filesystems: Vec<BarrierRecord>) -> Self {
        self.filesystems = filesystems;
        self
    }

    pub fn make_available(&mut self, keyfile: &Keyfile) {
        self.available.insert(keyfile.probe_path().to_path_buf());
    }

    /// The key-file shows up only after `misses` failed probes, like a USB
    /// stick plugged in while the prompt is up.
    pub fn make_available_after(&mut self, keyfile: &Keyfile, misses: usize) {
        self.appearing
            .insert(keyfile.probe_path().to_path_buf(), misses);
    }

    /// The next call of `kind` fails. Queued failures fire in order.
    pub fn fail_once(&mut self, kind: CallKind) {
        self.failures.push(kind);
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls.iter().filter(|call| call.kind() == kind).count()
    }

    /// Terminal states saved but not yet restored.
    pub fn open_ttys(&self) -> Vec<TtyToken> {
        self.open_ttys.iter().copied().map(TtyToken).collect()
    }

    fn record(&mut self, call: Call) -> Result<(), SuspendError> {
        let kind = call.kind();
        self.calls.push(call);
        match self.failures.iter().position(|failure| *failure == kind) {
            Some(index) => {
                self.failures.remove(index);
                Err(injected(kind))
            }
            None => Ok(()),
        }
    }
}

fn injected(kind: CallKind) -> SuspendError {
    let error_kind = match kind {
        CallKind::Lock | CallKind::UnlockKeyfile | CallKind::UnlockPassphrase => {
            SuspendErrorKind::VolumeOp
        }
        CallKind::CheckEnvironment
        | CallKind::PrepareEnvironment
        | CallKind::TeardownEnvironment
        | CallKind::SuspendInEnvironment => SuspendErrorKind::Environment,
        CallKind::DiscoverVolumes | CallKind::CrypttabKeyfiles => SuspendErrorKind::Config,
        _ => SuspendErrorKind::Io,
    };
    SuspendError::new(error_kind, format!("injected {kind:?} failure"))
}

impl VolumeDiscovery for FakeHost {
    fn discover_volumes(&mut self) -> Result<Vec<Volume>, SuspendError> {
        self.record(Call::DiscoverVolumes)?;
        Ok(self.volumes.clone())
    }

    fn crypttab_keyfiles(&mut self) -> Result<BTreeMap<String, Keyfile>, SuspendError> {
        self.record(Call::CrypttabKeyfiles)?;
        Ok(self.crypttab.clone())
    }
}

impl CryptOps for FakeHost {
    fn lock_volume(&mut self, volume: &Volume) -> Result<(), SuspendError> {
        self.record(Call::Lock(volume.name.clone()))
    }

    fn unlock_with_keyfile(
        &mut self,
        volume: &Volume,
        keyfile: &Keyfile,
    ) -> Result<(), SuspendError> {
        self.record(Call::UnlockKeyfile(volume.name.clone()))?;
        if self.available.contains(keyfile.probe_path()) {
            Ok(())
        } else {
            Err(SuspendError::volume_op("No key available with this passphrase."))
        }
    }

    fn unlock_with_passphrase(
        &mut self,
        volume: &Volume,
        passphrase: &[u8],
    ) -> Result<(), SuspendError> {
        self.record(Call::UnlockPassphrase(volume.name.clone()))?;
        match self.passphrases.get(&volume.name) {
            Some(expected) if expected.as_slice() == passphrase => Ok(()),
            _ => Err(SuspendError::volume_op("No key available with this passphrase.")),
        }
    }

    fn keyfile_available(&mut self, keyfile: &Keyfile) -> bool {
        let path = keyfile.probe_path().to_path_buf();
        if self.available.contains(&path) {
            return true;
        }
        match self.appearing.get_mut(&path) {
            Some(0) => {
                self.appearing.remove(&path);
                self.available.insert(path);
                true
            }
            Some(misses) => {
                *misses -= 1;
                false
            }
            None => false,
        }
    }
}

impl ServiceOps for FakeHost {
    fn stop_services(&mut self, names: &[&str]) -> Result<Vec<ServiceRecord>, SuspendError> {
        let requested = names.iter().map(|name| name.to_string()).collect();
        self.record(Call::StopServices(requested))?;
        Ok(names
            .iter()
            .map(|name| ServiceRecord {
                name: name.to_string(),
                was_active: self.active_services.contains(*name),
            })
            .collect())
    }

    fn start_services(&mut self, services: &[ServiceRecord]) -> Result<(), SuspendError> {
        let started = services
            .iter()
            .filter(|service| service.was_active)
            .map(|service| service.name.clone());
        self.record(Call::StartServices(started.collect()))
    }

    fn start_device_daemon(&mut self) -> Result<(), SuspendError> {
        self.record(Call::StartDeviceDaemon)
    }

    fn stop_device_daemon(&mut self) -> Result<(), SuspendError> {
        self.record(Call::StopDeviceDaemon)
    }
}

impl FilesystemOps for FakeHost {
    fn barrier_inventory(&mut self) -> Result<Vec<BarrierRecord>, SuspendError> {
        self.record(Call::BarrierInventory)?;
        Ok(self.filesystems.clone())
    }

    fn disable_barriers(&mut self, filesystems: &[BarrierRecord]) -> Result<(), SuspendError> {
        let mount_points = filesystems.iter().map(|fs| fs.mount_point.clone());
        self.record(Call::DisableBarriers(mount_points.collect()))
    }

    fn enable_barriers(&mut self, filesystems: &[BarrierRecord]) -> Result<(), SuspendError> {
        let mount_points = filesystems.iter().map(|fs| fs.mount_point.clone());
        self.record(Call::EnableBarriers(mount_points.collect()))
    }

    fn sync(&mut self) -> Result<(), SuspendError> {
        self.record(Call::Sync)
    }
}

impl PowerOps for FakeHost {
    fn suspend_to_ram(&mut self) -> Result<(), SuspendError> {
        self.record(Call::SuspendToRam)
    }

    fn run_sleep_hooks(&mut self, phase: HookPhase) -> Result<(), SuspendError> {
        self.record(Call::SleepHooks(phase))
    }
}

impl ResumeEnvironment for FakeHost {
    fn check_environment(&mut self) -> Result<(), SuspendError> {
        self.record(Call::CheckEnvironment)
    }

    fn prepare_environment(&mut self) -> Result<(), SuspendError> {
        self.record(Call::PrepareEnvironment)
    }

    fn teardown_environment(&mut self) -> Result<(), SuspendError> {
        self.record(Call::TeardownEnvironment)
    }

    fn suspend_in_environment(&mut self, registry: &VolumeRegistry) -> Result<(), SuspendError> {
        let volume_names = registry.iter().map(|volume| volume.name.clone());
        self.record(Call::SuspendInEnvironment(volume_names.collect()))
    }
}

impl Console for FakeHost {
    fn alter_tty(&mut self, mode: TtyMode) -> Result<TtyToken, SuspendError> {
        self.record(Call::AlterTty(mode))?;
        self.next_token += 1;
        self.open_ttys.insert(self.next_token);
        Ok(TtyToken(self.next_token))
    }

    fn restore_tty(&mut self, token: TtyToken) -> Result<(), SuspendError> {
        self.record(Call::RestoreTty(token))?;
        if self.open_ttys.remove(&token.0) {
            Ok(())
        } else {
            self.double_restores += 1;
            Err(SuspendError::io(format!("terminal state {} not saved", token.0)))
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>, SuspendError> {
        Ok(self.input.pop_front())
    }

    fn write_text(&mut self, text: &str) -> Result<(), SuspendError> {
        self.output.push_str(text);
        Ok(())
    }

    fn debug_shell(&mut self) -> Result<(), SuspendError> {
        self.record(Call::DebugShell)
    }
}
