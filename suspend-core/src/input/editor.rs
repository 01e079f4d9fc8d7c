// SPDX-License-Identifier: GPL-3.0-only

//! Byte-at-a-time passphrase line editor
//!
//! Pure state machine: [`LineEditor::feed`] never performs I/O. Side effects
//! (sleeping, spawning a shell) are requested through the returned [`Step`]
//! and carried out by the read loop in [`super::prompt`].

use zeroize::{Zeroize, Zeroizing};

use super::Passphrase;

/// Working buffer size. The buffer never grows, so no stale copy of a
/// passphrase is left behind by a reallocation.
pub const MAX_PASSPHRASE_LEN: usize = 4096;

pub const ESCAPE: u8 = 0x1b;
pub const KILL_LINE: u8 = 0x17;
pub const NEWLINE: u8 = b'\n';
pub const INTERRUPT: u8 = 0x03;
pub const RESCAN: u8 = 0x12;
pub const DEBUG_SHELL: u8 = 0x14;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;
const KILL_TO_START: u8 = 0x15;

/// Which command bytes are live for this prompt. A disabled command byte is
/// ordinary input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptFeatures {
    /// Escape suspends to RAM
    pub suspend: bool,
    /// Ctrl-R rescans for a key-file; only when one is defined
    pub rescan: bool,
    /// Ctrl-T opens a debug shell; only in debug mode
    pub debug_shell: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Editing,
    /// Line editing paused while the machine sleeps or a debug shell runs
    Suspended,
    Cancelled,
    Submitted,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Suspend to RAM, then re-prompt
    Suspend,
    /// Run a debug shell, then re-prompt
    DebugShell,
    Submit(Passphrase),
    /// Retry the key-file before asking again
    Rescan,
    Cancel,
}

pub struct LineEditor {
    buffer: Zeroizing<Vec<u8>>,
    features: PromptFeatures,
    state: EditorState,
}

impl LineEditor {
    pub fn new(features: PromptFeatures) -> Self {
        Self {
            buffer: fresh_buffer(),
            features,
            state: EditorState::Editing,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Process one input byte. Bytes arriving outside `Editing` are dropped.
    pub fn feed(&mut self, byte: u8) -> Step {
        if self.state != EditorState::Editing {
            return Step::Continue;
        }

        match byte {
            ESCAPE if self.features.suspend => {
                self.discard();
                self.state = EditorState::Suspended;
                Step::Suspend
            }
            KILL_LINE => {
                self.discard();
                Step::Continue
            }
            NEWLINE => {
                self.state = EditorState::Submitted;
                Step::Submit(self.take())
            }
            INTERRUPT => {
                self.discard();
                self.state = EditorState::Cancelled;
                Step::Cancel
            }
            RESCAN if self.features.rescan => {
                self.discard();
                self.state = EditorState::Submitted;
                Step::Rescan
            }
            DEBUG_SHELL if self.features.debug_shell => {
                self.discard();
                self.state = EditorState::Suspended;
                Step::DebugShell
            }
            _ => {
                self.edit(byte);
                Step::Continue
            }
        }
    }

    /// Back to `Editing` after a suspend or debug shell.
    pub fn resume_editing(&mut self) {
        if self.state == EditorState::Suspended {
            self.state = EditorState::Editing;
        }
    }

    fn edit(&mut self, byte: u8) {
        match byte {
            BACKSPACE | DELETE => {
                if let Some(last) = self.buffer.last_mut() {
                    *last = 0;
                }
                self.buffer.pop();
            }
            KILL_TO_START => self.discard(),
            _ if self.buffer.len() < MAX_PASSPHRASE_LEN => self.buffer.push(byte),
            _ => {}
        }
    }

    fn discard(&mut self) {
        self.buffer.zeroize();
    }

    /// Hand the allocation itself to the caller; nothing is copied.
    fn take(&mut self) -> Passphrase {
        Passphrase::from_buffer(std::mem::replace(&mut self.buffer, fresh_buffer()))
    }
}

fn fresh_buffer() -> Zeroizing<Vec<u8>> {
    Zeroizing::new(Vec::with_capacity(MAX_PASSPHRASE_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(editor: &mut LineEditor, input: &[u8]) -> Vec<Step> {
        input
            .iter()
            .map(|&byte| editor.feed(byte))
            .filter(|step| *step != Step::Continue)
            .collect()
    }

    fn submitted(bytes: &[u8]) -> Step {
        Step::Submit(Passphrase::from(bytes))
    }

    #[test]
    fn kill_line_discards_what_came_before() {
        let mut editor = LineEditor::new(PromptFeatures::default());
        assert_eq!(feed_all(&mut editor, b"abc\x17de\n"), vec![submitted(b"de")]);
        assert_eq!(editor.state(), EditorState::Submitted);
        assert!(editor.is_empty());
    }

    #[test]
    fn escape_discards_and_requests_suspend() {
        let mut editor = LineEditor::new(PromptFeatures {
            suspend: true,
            ..PromptFeatures::default()
        });

        assert_eq!(feed_all(&mut editor, b"wrong\x1b"), vec![Step::Suspend]);
        assert_eq!(editor.state(), EditorState::Suspended);
        assert!(editor.is_empty());

        // Input while suspended is dropped.
        assert_eq!(editor.feed(b'x'), Step::Continue);
        assert!(editor.is_empty());

        editor.resume_editing();
        assert_eq!(feed_all(&mut editor, b"pass\n"), vec![submitted(b"pass")]);
    }

    #[test]
    fn escape_is_text_when_suspend_is_disabled() {
        let mut editor = LineEditor::new(PromptFeatures::default());
        assert_eq!(feed_all(&mut editor, b"a\x1bb\n"), vec![submitted(b"a\x1bb")]);
    }

    #[test]
    fn interrupt_cancels() {
        let mut editor = LineEditor::new(PromptFeatures::default());
        assert_eq!(feed_all(&mut editor, b"secret\x03"), vec![Step::Cancel]);
        assert_eq!(editor.state(), EditorState::Cancelled);
        assert!(editor.is_empty());
        assert!(feed_all(&mut editor, b"more\n").is_empty());
    }

    #[test]
    fn rescan_only_with_keyfile() {
        let mut without = LineEditor::new(PromptFeatures::default());
        assert_eq!(feed_all(&mut without, b"a\x12b\n"), vec![submitted(b"a\x12b")]);

        let mut with = LineEditor::new(PromptFeatures {
            rescan: true,
            ..PromptFeatures::default()
        });
        assert_eq!(feed_all(&mut with, b"abc\x12"), vec![Step::Rescan]);
        assert_eq!(with.state(), EditorState::Submitted);
        assert!(with.is_empty());
    }

    #[test]
    fn debug_shell_only_in_debug_mode() {
        let mut plain = LineEditor::new(PromptFeatures::default());
        assert_eq!(feed_all(&mut plain, b"\x14\n"), vec![submitted(b"\x14")]);

        let mut debug = LineEditor::new(PromptFeatures {
            debug_shell: true,
            ..PromptFeatures::default()
        });
        assert_eq!(feed_all(&mut debug, b"xy\x14"), vec![Step::DebugShell]);
        assert_eq!(debug.state(), EditorState::Suspended);
        debug.resume_editing();
        assert_eq!(feed_all(&mut debug, b"z\n"), vec![submitted(b"z")]);
    }

    #[test]
    fn basic_line_editing() {
        let mut editor = LineEditor::new(PromptFeatures::default());
        assert_eq!(
            feed_all(&mut editor, b"abx\x7fc\x08d\n"),
            vec![submitted(b"abd")]
        );

        let mut editor = LineEditor::new(PromptFeatures::default());
        assert_eq!(feed_all(&mut editor, b"junk\x15ok\n"), vec![submitted(b"ok")]);

        let mut editor = LineEditor::new(PromptFeatures::default());
        assert_eq!(feed_all(&mut editor, b"\x7f\x7fa\n"), vec![submitted(b"a")]);
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let mut editor = LineEditor::new(PromptFeatures::default());
        for _ in 0..MAX_PASSPHRASE_LEN + 10 {
            editor.feed(b'a');
        }
        assert_eq!(editor.len(), MAX_PASSPHRASE_LEN);

        match editor.feed(NEWLINE) {
            Step::Submit(passphrase) => assert_eq!(passphrase.len(), MAX_PASSPHRASE_LEN),
            other => panic!("expected submit, got {other:?}"),
        }
    }
}
