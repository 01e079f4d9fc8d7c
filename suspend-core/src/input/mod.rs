// SPDX-License-Identifier: GPL-3.0-only

//! Secure passphrase input
//!
//! [`editor`] is the byte-level state machine, [`prompt`] drives it from
//! the terminal and performs the side effects it asks for.

pub mod editor;
pub mod passphrase;
pub mod prompt;

pub use editor::{EditorState, LineEditor, MAX_PASSPHRASE_LEN, PromptFeatures, Step};
pub use passphrase::Passphrase;
pub use prompt::{PromptOutcome, prompt_text, read_passphrase};
