// SPDX-License-Identifier: GPL-3.0-only

//! Lock and unlock order
//!
//! Volumes are locked in reverse registry order with the root volume last,
//! and resumed root first. A volume may be a file on the root filesystem;
//! locking root before it would leave that volume's backing file
//! unreachable while it still needs to be locked.
//!
//! Known limitation: two non-root volumes where one lives inside the other
//! are not ordered. That needs a dependency graph between volumes, which is
//! not built here.

use suspend_contracts::{CryptOps, SuspendError};
use suspend_types::{Keyfile, Volume};
use tracing::debug;

use crate::input::Passphrase;

pub fn lock_order(volumes: &[Volume]) -> Vec<&Volume> {
    volumes
        .iter()
        .rev()
        .filter(|volume| !volume.is_root)
        .chain(volumes.iter().filter(|volume| volume.is_root))
        .collect()
}

pub fn unlock_order(volumes: &[Volume]) -> Vec<&Volume> {
    volumes
        .iter()
        .filter(|volume| volume.is_root)
        .chain(volumes.iter().filter(|volume| !volume.is_root))
        .collect()
}

/// Lock every volume. Stops at the first failure and reports it; what that
/// failure means is up to the caller.
pub fn lock_all<C: CryptOps + ?Sized>(
    crypt: &mut C,
    volumes: &[Volume],
) -> Result<(), SuspendError> {
    for volume in lock_order(volumes) {
        debug!("locking {volume}");
        crypt
            .lock_volume(volume)
            .map_err(|error| error.context(format_args!("locking {}", volume.name)))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum Unlock<'a> {
    Keyfile(&'a Keyfile),
    Passphrase(&'a Passphrase),
}

pub fn unlock_one<C: CryptOps + ?Sized>(
    crypt: &mut C,
    volume: &Volume,
    with: Unlock<'_>,
) -> Result<(), SuspendError> {
    let result = match with {
        Unlock::Keyfile(keyfile) => {
            debug!("unlocking {volume} with keyfile {}", keyfile.path.display());
            crypt.unlock_with_keyfile(volume, keyfile)
        }
        Unlock::Passphrase(passphrase) => {
            debug!("unlocking {volume} with passphrase");
            crypt.unlock_with_passphrase(volume, passphrase.expose())
        }
    };
    result.map_err(|error| error.context(format_args!("unlocking {}", volume.name)))
}
