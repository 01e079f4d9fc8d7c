// SPDX-License-Identifier: GPL-3.0-only

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use suspend_types::HookPhase;
use tracing::{debug, warn};

use crate::command::run_status;
use crate::error::{Result, SysError};

const POWER_STATE: &str = "/sys/power/state";

/// Blocks until the machine wakes up again.
pub fn suspend_to_ram() -> Result<()> {
    let mut state = File::options().write(true).open(POWER_STATE)?;
    state.write_all(b"mem")?;
    Ok(())
}

/// Executable regular files in `dir`, in lexical order.
pub fn sleep_hooks(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error.into()),
    };

    let mut hooks = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };
        if metadata.is_file() && metadata.permissions().mode() & 0o111 != 0 {
            hooks.push(path);
        }
    }
    hooks.sort();
    Ok(hooks)
}

/// Run every hook as `HOOK pre|post suspend`. A failing hook does not stop
/// the others.
pub fn run_sleep_hooks(dir: &Path, phase: HookPhase) -> Result<()> {
    let mut failed = Vec::new();

    for hook in sleep_hooks(dir)? {
        debug!("running {} {phase} suspend", hook.display());
        match run_status(&hook, &[phase.as_arg(), "suspend"]) {
            Ok(true) => {}
            Ok(false) => failed.push(hook.display().to_string()),
            Err(error) => {
                warn!("{}: {error}", hook.display());
                failed.push(hook.display().to_string());
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(SysError::OperationFailed(format!(
            "{phase}-suspend hooks failed: {}",
            failed.join(", ")
        )))
    }
}
