use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

/// A 32-bit RGBA color, red in the most significant byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct Color(u32);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseColorError {
    #[error("color {0:?} must start with '#' or '0x'")]
    MissingPrefix(String),
    #[error("color {0:?} must have 6 or 8 hex digits")]
    BadLength(String),
    #[error("color {0:?} is not valid hex")]
    BadDigit(String),
}

impl Color {
    pub const fn from_rgba(rgba: u32) -> Self { Color(rgba) }

    pub fn channels(self) -> [u8; 4] { self.0.to_be_bytes() }

    /// Premultiplied bytes in r, g, b, a order, as stored by a pixmap.
    pub fn premultiplied(self) -> [u8; 4] {
        let [r, g, b, a] = self.channels();
        let mul = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
        [mul(r), mul(g), mul(b), a]
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        let [r, g, b, a] = self.channels();
        tiny_skia::Color::from_rgba8(r, g, b, a)
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .or_else(|| s.strip_prefix("0x"))
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseColorError::MissingPrefix(s.to_string()))?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError::BadDigit(s.to_string()));
        }
        let value =
            u32::from_str_radix(digits, 16).map_err(|_| ParseColorError::BadDigit(s.to_string()))?;
        match digits.len() {
            6 => Ok(Color(value << 8 | 0xFF)),
            8 => Ok(Color(value)),
            _ => Err(ParseColorError::BadLength(s.to_string())),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{:08x}", self.0) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_all_notations() {
        assert_eq!("#323232".parse(), Ok(Color::from_rgba(0x323232FF)));
        assert_eq!("#5a8ac680".parse(), Ok(Color::from_rgba(0x5A8AC680)));
        assert_eq!("0xFFFFFFFF".parse(), Ok(Color::from_rgba(0xFFFFFFFF)));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(matches!("323232".parse::<Color>(), Err(ParseColorError::MissingPrefix(_))));
        assert!(matches!("#3232".parse::<Color>(), Err(ParseColorError::BadLength(_))));
        assert!(matches!("#32323g".parse::<Color>(), Err(ParseColorError::BadDigit(_))));
        assert!(matches!("#+32323".parse::<Color>(), Err(ParseColorError::BadDigit(_))));
    }

    #[test]
    fn red_is_the_high_byte() {
        assert_eq!(Color::from_rgba(0xFF00_33FF).channels(), [0xFF, 0x00, 0x33, 0xFF]);
    }

    #[test]
    fn premultiplies_by_alpha() {
        assert_eq!(Color::from_rgba(0xFF80_0080).premultiplied(), [128, 64, 0, 128]);
        assert_eq!(Color::from_rgba(0x4A4A4AFF).premultiplied(), [0x4A, 0x4A, 0x4A, 0xFF]);
    }

    #[test]
    fn display_round_trips() {
        let color = Color::from_rgba(0x4A4A4AFF);
        assert_eq!(color.to_string(), "#4a4a4aff");
        assert_eq!(color.to_string().parse(), Ok(color));
    }
}
