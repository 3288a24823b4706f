//! Static catalog of preset combos.

use trailcast_platform::Rgb;

use crate::config::{TrailConfig, TrailStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub id: &'static str,
    pub shortcut: char,
    pub name: &'static str,
    pub description: &'static str,
    pub config: TrailConfig,
}

pub static PRESETS: [Preset; 5] = [
    Preset {
        id: "neon",
        shortcut: '1',
        name: "Neon",
        description: "Soft cyan glow that lingers",
        config: TrailConfig {
            style: TrailStyle::Glow,
            color: Rgb::new(0x22, 0xD3, 0xEE),
            size: 28,
            fade_rate: 45,
        },
    },
    Preset {
        id: "ember",
        shortcut: '2',
        name: "Ember",
        description: "Quick orange sparks",
        config: TrailConfig {
            style: TrailStyle::Sparkle,
            color: Rgb::new(0xF9, 0x73, 0x16),
            size: 24,
            fade_rate: 60,
        },
    },
    Preset {
        id: "ink",
        shortcut: '3',
        name: "Ink",
        description: "Wide translucent brush strokes",
        config: TrailConfig {
            style: TrailStyle::Brush,
            color: Rgb::new(0x1F, 0x29, 0x37),
            size: 36,
            fade_rate: 35,
        },
    },
    Preset {
        id: "starlight",
        shortcut: '4',
        name: "Starlight",
        description: "Golden stars",
        config: TrailConfig {
            style: TrailStyle::Star,
            color: Rgb::new(0xFA, 0xCC, 0x15),
            size: 26,
            fade_rate: 50,
        },
    },
    Preset {
        id: "candy",
        shortcut: '5',
        name: "Candy",
        description: "Pink gradient dots",
        config: TrailConfig {
            style: TrailStyle::Gradient,
            color: Rgb::new(0xEC, 0x48, 0x99),
            size: 22,
            fade_rate: 55,
        },
    },
];

pub fn find(id: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.id == id)
}

pub fn by_shortcut(key: char) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.shortcut == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FADE_MAX, FADE_MIN, SIZE_MAX, SIZE_MIN};

    #[test]
    fn test_shortcuts_are_consecutive_digits() {
        for (index, preset) in PRESETS.iter().enumerate() {
            assert_eq!(preset.shortcut.to_digit(10), Some(index as u32 + 1));
        }
    }

    #[test]
    fn test_presets_are_within_ranges() {
        for preset in &PRESETS {
            assert!(preset.config.style.is_known());
            assert!((SIZE_MIN..=SIZE_MAX).contains(&preset.config.size));
            assert!((FADE_MIN..=FADE_MAX).contains(&preset.config.fade_rate));
        }
    }

    #[test]
    fn test_lookup_by_id_and_shortcut() {
        assert_eq!(find("ink").map(|p| p.shortcut), Some('3'));
        assert_eq!(by_shortcut('4').map(|p| p.id), Some("starlight"));
        assert!(find("nope").is_none());
        assert!(by_shortcut('9').is_none());
    }
}
