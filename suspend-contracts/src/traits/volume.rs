// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;

use suspend_types::{Keyfile, Volume};

use crate::SuspendError;

pub trait VolumeDiscovery {
    /// Unlocked encrypted volumes in discovery order, with `is_root` set and
    /// the root volume's key-file resolved from static boot configuration.
    fn discover_volumes(&mut self) -> Result<Vec<Volume>, SuspendError>;

    /// Key-files for non-root volumes, keyed by volume name. Only safe to
    /// call once the root filesystem is readable again.
    fn crypttab_keyfiles(&mut self) -> Result<BTreeMap<String, Keyfile>, SuspendError>;
}

pub trait CryptOps {
    /// Wipe the volume's key from memory; I/O to it blocks until unlocked.
    fn lock_volume(&mut self, volume: &Volume) -> Result<(), SuspendError>;

    fn unlock_with_keyfile(&mut self, volume: &Volume, keyfile: &Keyfile)
    -> Result<(), SuspendError>;

    fn unlock_with_passphrase(
        &mut self,
        volume: &Volume,
        passphrase: &[u8],
    ) -> Result<(), SuspendError>;

    /// Checked at the moment of use; removable key media come and go.
    fn keyfile_available(&mut self, keyfile: &Keyfile) -> bool;
}
