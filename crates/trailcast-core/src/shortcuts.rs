//! Keyboard shortcut resolution.

use crate::preset;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub meta: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Shift does not count: `T` and `t` are the same shortcut.
    pub fn any_command(&self) -> bool {
        self.meta || self.ctrl || self.alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: char,
    pub modifiers: Modifiers,
    /// The focused element accepts text, so keys belong to it.
    pub in_text_input: bool,
}

impl KeyEvent {
    pub fn plain(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
            in_text_input: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    ToggleActive,
    ToggleRecording,
    ShrinkSize,
    GrowSize,
    ApplyPreset(&'static str),
}

/// Map a key event to its action. `None` means the event is not ours and its
/// default handling must not be suppressed.
pub fn resolve(event: &KeyEvent) -> Option<ShortcutAction> {
    if event.modifiers.any_command() || event.in_text_input {
        return None;
    }
    match event.key {
        't' | 'T' => Some(ShortcutAction::ToggleActive),
        'r' | 'R' => Some(ShortcutAction::ToggleRecording),
        '[' => Some(ShortcutAction::ShrinkSize),
        ']' => Some(ShortcutAction::GrowSize),
        digit if digit.is_ascii_digit() => {
            preset::by_shortcut(digit).map(|preset| ShortcutAction::ApplyPreset(preset.id))
        }
        _ => None,
    }
}
