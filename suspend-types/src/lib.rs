// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for the LUKS suspend/resume tools
//!
//! This crate defines the data shared by every other crate in the workspace:
//!
//! - **suspend-sys**: Produces volumes, barrier and service records from the live system
//! - **suspend-core**: Sequences them through one suspend/resume cycle
//! - **suspend-app**: Moves the registry into the resume environment via [`handoff`]
//!
//! Nothing here touches the operating system.

pub mod handoff;
pub mod paths;
pub mod records;
pub mod registry;
pub mod tty;
pub mod volume;

pub use handoff::{DecodeError, EncodeError, MAX_PAYLOAD_LEN};
pub use paths::HostPaths;
pub use records::{BarrierRecord, HookPhase, SUSPEND_SERVICES, ServiceRecord};
pub use registry::{RegistryError, VolumeRegistry};
pub use tty::{TtyMode, TtyToken};
pub use volume::{Keyfile, KeyfileState, Volume};
