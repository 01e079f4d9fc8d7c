// SPDX-License-Identifier: GPL-3.0-only

pub mod error;
pub mod traits;

pub use error::{SuspendError, SuspendErrorKind};
pub use traits::{
    Console, CryptOps, FilesystemOps, PowerOps, ResumeEnvironment, ServiceOps, SuspendHost,
    VolumeDiscovery,
};
