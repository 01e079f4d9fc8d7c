// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use suspend_types::ServiceRecord;
use tracing::{debug, warn};

use crate::command::{run_command, run_status};
use crate::error::{Result, SysError};

const UDEVD: &str = "/usr/lib/systemd/systemd-udevd";
const UDEVADM: &str = "/usr/bin/udevadm";

fn run_systemctl(args: &[&str]) -> Result<String> {
    run_command("systemctl", args).map_err(|error| match error {
        SysError::CommandFailed { stderr, .. } => {
            SysError::OperationFailed(format!("systemctl {} failed: {stderr}", args.join(" ")))
        }
        other => other,
    })
}

pub fn is_active(unit: &str) -> Result<bool> {
    run_status("systemctl", &["is-active", "--quiet", unit])
}

/// Record which units are active, then stop all of them.
pub fn stop_units(units: &[&str]) -> Result<Vec<ServiceRecord>> {
    let mut records = Vec::with_capacity(units.len());
    for unit in units {
        let was_active = is_active(unit)?;
        debug!("{unit}: active={was_active}");
        records.push(ServiceRecord {
            name: unit.to_string(),
            was_active,
        });
    }

    let mut args = vec!["stop"];
    args.extend_from_slice(units);
    run_systemctl(&args)?;
    Ok(records)
}

/// Start the units that were active before; the rest stay stopped.
pub fn start_units(services: &[ServiceRecord]) -> Result<()> {
    let active: Vec<&str> = services
        .iter()
        .filter(|service| service.was_active)
        .map(|service| service.name.as_str())
        .collect();
    if active.is_empty() {
        return Ok(());
    }

    let mut args = vec!["start"];
    args.extend(active);
    run_systemctl(&args)?;
    Ok(())
}

/// udevd inside the resume environment, so removable key media show up
/// under /dev/disk.
pub fn start_udevd() -> Result<()> {
    if !Path::new(UDEVD).exists() {
        warn!("{UDEVD} not present, key-file devices will not be detected");
        return Ok(());
    }
    run_command(UDEVD, &["--daemon", "--resolve-names=never"])?;
    Ok(())
}

pub fn stop_udevd() -> Result<()> {
    if !Path::new(UDEVD).exists() {
        return Ok(());
    }
    run_command(UDEVADM, &["control", "--exit"])?;
    Ok(())
}
