// SPDX-License-Identifier: GPL-3.0-only

//! Test support: a [`FakeHost`] that records every host call in order and
//! fails on request.

pub mod host;
pub mod ledger;

pub use host::FakeHost;
pub use ledger::{Call, CallKind};
