//! RGBA colors.
//!
//! Surfaces are configured with CSS-like strings (`"#3B82F6"`, `"grey"`),
//! so colors parse from and serialize back to that form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red component (0-1).
    pub r: f32,
    /// Green component (0-1).
    pub g: f32,
    /// Blue component (0-1).
    pub b: f32,
    /// Alpha component (0-1).
    pub a: f32,
}

/// A color string that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color {0:?}: expected #RGB, #RRGGBB, #RRGGBBAA or a basic color name")]
pub struct ColorParseError(pub String);

impl Color {
    /// Transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    /// Solid black.
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Solid white.
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    /// CSS `grey` (#808080).
    pub const GREY: Self = Self::rgb8(0x80, 0x80, 0x80);
    /// CSS `darkgrey` (#A9A9A9), the neutral diamond color.
    pub const DARK_GREY: Self = Self::rgb8(0xA9, 0xA9, 0xA9);
    /// Pure green, the default positive vote color.
    pub const GREEN: Self = Self::rgb8(0x00, 0xFF, 0x00);
    /// Pure red, the default negative vote color.
    pub const RED: Self = Self::rgb8(0xFF, 0x00, 0x00);

    /// Creates a color from RGBA values (0-1).
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from RGB values (0-1) with full alpha.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Creates an opaque color from 8-bit channels.
    #[must_use]
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Creates a color from hex value (0xRRGGBBAA).
    #[must_use]
    pub const fn hex(hex: u32) -> Self {
        let r = ((hex >> 24) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let b = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let a = (hex & 0xFF) as f32 / 255.0;
        Self::rgba(r, g, b, a)
    }

    /// Returns a new color with different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }

    /// Linearly interpolates between two colors.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::rgba(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Converts to array format.
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "grey" | "gray" => Self::GREY,
            "darkgrey" | "darkgray" => Self::DARK_GREY,
            "red" => Self::RED,
            "lime" => Self::GREEN,
            "green" => Self::rgb8(0x00, 0x80, 0x00),
            "blue" => Self::rgb8(0x00, 0x00, 0xFF),
            "transparent" => Self::TRANSPARENT,
            _ => return None,
        };
        Some(color)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ColorParseError(s.to_owned());

        let Some(digits) = trimmed.strip_prefix('#') else {
            return Self::named(&trimmed.to_ascii_lowercase()).ok_or_else(err);
        };
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| err())?;

        match digits.len() {
            // #RGB expands each nibble
            3 => {
                let expand = |n: u32| ((n & 0xF) * 0x11) as u8;
                Ok(Self::rgb8(expand(value >> 8), expand(value >> 4), expand(value)))
            }
            6 => Ok(Self::hex((value << 8) | 0xFF)),
            8 => Ok(Self::hex(value)),
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        if a == 0xFF {
            write!(f, "#{r:02X}{g:02X}{b:02X}")
        } else {
            write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_lerp() {
        let mid = Color::BLACK.lerp(Color::WHITE, 0.5);

        assert!((mid.r - 0.5).abs() < 0.01);
        assert!((mid.g - 0.5).abs() < 0.01);
        assert!((mid.b - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!("#FF0000".parse::<Color>().unwrap(), Color::RED);
        assert_eq!("#f00".parse::<Color>().unwrap(), Color::RED);
        assert_eq!("#00FF0080".parse::<Color>().unwrap().to_string(), "#00FF0080");
        assert_eq!("#3B82F6".parse::<Color>().unwrap().to_string(), "#3B82F6");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("grey".parse::<Color>().unwrap(), Color::GREY);
        assert_eq!("Black".parse::<Color>().unwrap(), Color::BLACK);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("#12".parse::<Color>().is_err());
        assert!("#GGGGGG".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }
}
