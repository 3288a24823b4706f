//! Trail appearance: style, colour, size and fade rate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trailcast_platform::Rgb;

pub const SIZE_MIN: u32 = 12;
pub const SIZE_MAX: u32 = 60;
pub const SIZE_STEP: u32 = 2;
pub const FADE_MIN: u32 = 20;
pub const FADE_MAX: u32 = 120;

/// Visual style applied uniformly to every live point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrailStyle {
    Gradient,
    Sparkle,
    Brush,
    Star,
    Glow,
    /// A style name this build does not know; renders nothing.
    Other(String),
}

impl TrailStyle {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gradient => "gradient",
            Self::Sparkle => "sparkle",
            Self::Brush => "brush",
            Self::Star => "star",
            Self::Glow => "glow",
            Self::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl FromStr for TrailStyle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "gradient" => Self::Gradient,
            "sparkle" => Self::Sparkle,
            "brush" => Self::Brush,
            "star" => Self::Star,
            "glow" => Self::Glow,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for TrailStyle {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(style) => style,
            Err(never) => match never {},
        }
    }
}

impl From<TrailStyle> for String {
    fn from(value: TrailStyle) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TrailStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot read by every animation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailConfig {
    pub style: TrailStyle,
    pub color: Rgb,
    /// Point radius at full life, in logical pixels.
    pub size: u32,
    /// Life lost per step, in thousandths.
    pub fade_rate: u32,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            style: TrailStyle::Gradient,
            color: Rgb::new(0x8B, 0x5C, 0xF6),
            size: 22,
            fade_rate: 55,
        }
    }
}

impl TrailConfig {
    /// Grow or shrink by whole steps, clamped to `[SIZE_MIN, SIZE_MAX]`.
    pub fn adjust_size(&mut self, steps: i32) {
        let next = i64::from(self.size) + i64::from(steps) * i64::from(SIZE_STEP);
        self.size = clamp_size(next);
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = clamp_size(i64::from(size));
    }

    pub fn set_fade_rate(&mut self, fade_rate: u32) {
        self.fade_rate = fade_rate.clamp(FADE_MIN, FADE_MAX);
    }
}

fn clamp_size(size: i64) -> u32 {
    size.clamp(i64::from(SIZE_MIN), i64::from(SIZE_MAX)) as u32
}
