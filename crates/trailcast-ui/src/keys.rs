//! Translation from egui input events to engine key events.

use egui::{Event, Key};
use trailcast_core::{KeyEvent, Modifiers};

/// Character produced by `key`, for the keys a shortcut can live on.
pub fn key_char(key: Key, shift: bool) -> Option<char> {
    let c = match key {
        Key::OpenBracket => '[',
        Key::CloseBracket => ']',
        Key::Num0 => '0',
        Key::Num1 => '1',
        Key::Num2 => '2',
        Key::Num3 => '3',
        Key::Num4 => '4',
        Key::Num5 => '5',
        Key::Num6 => '6',
        Key::Num7 => '7',
        Key::Num8 => '8',
        Key::Num9 => '9',
        other => {
            let name = other.name();
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_lowercase(),
                _ => return None,
            }
        }
    };
    Some(if shift { c.to_ascii_uppercase() } else { c })
}

pub fn modifiers(m: egui::Modifiers) -> Modifiers {
    Modifiers {
        meta: m.mac_cmd,
        ctrl: m.ctrl,
        alt: m.alt,
        shift: m.shift,
    }
}

/// Key event for a fresh key press, `None` for releases, repeats and everything else.
pub fn key_event(event: &Event, in_text_input: bool) -> Option<KeyEvent> {
    let Event::Key {
        key,
        pressed: true,
        repeat: false,
        modifiers: mods,
        ..
    } = event
    else {
        return None;
    };
    Some(KeyEvent {
        key: key_char(*key, mods.shift)?,
        modifiers: modifiers(*mods),
        in_text_input,
    })
}
