// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system operations for the LUKS suspend/resume tools
//!
//! Everything that touches the live system goes through here:
//! - cryptsetup, systemctl and udevd invocations
//! - mountinfo parsing and write-barrier remounts
//! - bind mounts and the chrooted resume environment
//! - termios, `/sys/power/state` and system sleep hooks
//! - sysfs, crypttab and kernel command line discovery
//!
//! These operations require root and are only called from the binaries in
//! suspend-app, through [`LinuxHost`].

pub mod cmdline;
pub mod command;
pub mod cryptsetup;
pub mod crypttab;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod host;
pub mod mounts;
pub mod power;
pub mod systemd;
pub mod tty;

pub use environment::STATE_FD;
pub use error::{Result, SysError};
pub use host::LinuxHost;
