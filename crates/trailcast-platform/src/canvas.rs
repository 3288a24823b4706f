use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque 8-bit RGB colour. Serialised as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex colour {:?}", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            // #RGB shorthand: each digit is doubled
            3 => {
                let short = |digit: &str| channel(digit).map(|v| v * 17);
                Ok(Self::new(
                    short(&hex[0..1])?,
                    short(&hex[1..2])?,
                    short(&hex[2..3])?,
                ))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// One colour stop of a radial gradient. `offset` is in `[0, 1]` from the centre outwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgb,
    pub alpha: f32,
}

impl GradientStop {
    pub fn new(offset: f32, color: Rgb, alpha: f32) -> Self {
        Self {
            offset,
            color,
            alpha,
        }
    }
}

/// Immediate-mode 2D raster surface. Coordinates are logical pixels; the
/// implementation owns any device-pixel scaling.
pub trait Canvas {
    /// Reset every pixel to fully transparent.
    fn clear(&mut self);

    /// Fill a disc with a radial gradient centred on it.
    fn fill_radial_disc(&mut self, center: Vec2, radius: f32, stops: &[GradientStop]);

    fn stroke_line(&mut self, from: Vec2, to: Vec2, color: Rgb, alpha: f32, width: f32);

    /// Fill an ellipse with semi-axes `radii`, rotated by `rotation` radians.
    /// `opacity` multiplies the flat fill colour globally.
    fn fill_ellipse(&mut self, center: Vec2, radii: Vec2, rotation: f32, color: Rgb, opacity: f32);

    /// Fill a closed polygon through `points`.
    fn fill_polygon(&mut self, points: &[Vec2], color: Rgb, alpha: f32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_hex() {
        let rgb: Rgb = "#3B82F6".parse().unwrap();
        assert_eq!(rgb, Rgb::new(0x3B, 0x82, 0xF6));
        assert_eq!("3b82f6".parse::<Rgb>().unwrap(), rgb);
    }

    #[test]
    fn test_parse_short_hex() {
        assert_eq!("#fa0".parse::<Rgb>().unwrap(), Rgb::new(0xFF, 0xAA, 0x00));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Rgb>().is_err());
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#GGGGGG".parse::<Rgb>().is_err());
        assert!("#ééé".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_display_is_upper_hex() {
        assert_eq!(Rgb::new(0x3b, 0x82, 0xf6).to_string(), "#3B82F6");
    }
}
