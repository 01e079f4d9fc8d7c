// SPDX-License-Identifier: GPL-3.0-only

pub mod console;
pub mod environment;
pub mod system;
pub mod volume;

pub use console::Console;
pub use environment::ResumeEnvironment;
pub use system::{FilesystemOps, PowerOps, ServiceOps};
pub use volume::{CryptOps, VolumeDiscovery};

/// Everything the engine needs from the machine it runs on.
pub trait SuspendHost:
    VolumeDiscovery + CryptOps + ServiceOps + FilesystemOps + PowerOps + ResumeEnvironment + Console
{
}

impl<T> SuspendHost for T where
    T: VolumeDiscovery
        + CryptOps
        + ServiceOps
        + FilesystemOps
        + PowerOps
        + ResumeEnvironment
        + Console
{
}
