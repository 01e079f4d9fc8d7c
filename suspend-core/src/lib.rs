// SPDX-License-Identifier: GPL-3.0-only

//! Suspend/resume orchestration
//!
//! Locks every unlocked LUKS volume before suspend-to-RAM and brings them
//! back afterwards, asking for the root passphrase from inside the resume
//! environment. All OS access goes through [`suspend_contracts::SuspendHost`].
//!
//! - [`sequencer`]: lock and unlock order
//! - [`input`]: raw-terminal passphrase entry
//! - [`session`]: failure phase and cleanup stack
//! - [`controller`]: the full-privilege side of one cycle
//! - [`resume`]: the resume-environment side, and volume resume loops

pub mod controller;
pub mod input;
pub mod resume;
pub mod sequencer;
pub mod session;

pub use controller::{SessionOptions, run_suspend};
pub use input::{Passphrase, PromptFeatures, PromptOutcome, read_passphrase};
pub use resume::{PromptMode, resume_volume, run_resume_environment};
pub use sequencer::{Unlock, lock_all, lock_order, unlock_one, unlock_order};
pub use session::{Escalation, Phase, Release, ReleaseKind, Session};
