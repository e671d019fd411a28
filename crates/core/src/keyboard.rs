//! Key press → session command mapping.
//!
//! Digits `1`-`9` pick an option on the current question, `Alt`+digit strikes
//! it out instead. Letters: `n` next, `p` previous, `f` flag, `r` review,
//! `c` clear answer. Arrow keys also navigate. Nothing is mapped while focus
//! is inside a text field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        ctrl: false,
        meta: false,
        shift: false,
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };
}

/// Where keyboard focus sits when the key is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusTarget {
    #[default]
    Page,
    TextInput,
    TextArea,
}

impl FocusTarget {
    #[must_use]
    pub fn is_text_entry(self) -> bool {
        matches!(self, FocusTarget::TextInput | FocusTarget::TextArea)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub focus: FocusTarget,
}

impl KeyEvent {
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            focus: FocusTarget::Page,
        }
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn with_focus(mut self, focus: FocusTarget) -> Self {
        self.focus = focus;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCommand {
    /// Zero-based option index.
    SelectOption(usize),
    /// Zero-based option index.
    ToggleEliminate(usize),
    Next,
    Previous,
    ToggleFlag,
    ToggleReview,
    ClearAnswer,
}

/// Map a key press to a command for a question with `option_count` options.
///
/// Returns `None` for unmapped keys, digits beyond the option count, chords
/// with `Ctrl`/`Meta`, and any key typed into a text field.
#[must_use]
pub fn map_key(event: &KeyEvent, option_count: usize) -> Option<KeyCommand> {
    if event.focus.is_text_entry() {
        return None;
    }
    if event.modifiers.ctrl || event.modifiers.meta {
        return None;
    }

    match event.key {
        Key::Char(c) => {
            if let Some(digit) = c.to_digit(10) {
                let digit = usize::try_from(digit).ok()?;
                if digit == 0 || digit > option_count {
                    return None;
                }
                let index = digit - 1;
                return Some(if event.modifiers.alt {
                    KeyCommand::ToggleEliminate(index)
                } else {
                    KeyCommand::SelectOption(index)
                });
            }
            if event.modifiers.alt {
                return None;
            }
            match c.to_ascii_lowercase() {
                'n' => Some(KeyCommand::Next),
                'p' => Some(KeyCommand::Previous),
                'f' => Some(KeyCommand::ToggleFlag),
                'r' => Some(KeyCommand::ToggleReview),
                'c' => Some(KeyCommand::ClearAnswer),
                _ => None,
            }
        }
        Key::ArrowRight if !event.modifiers.alt => Some(KeyCommand::Next),
        Key::ArrowLeft if !event.modifiers.alt => Some(KeyCommand::Previous),
        _ => None,
    }
}
