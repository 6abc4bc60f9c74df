//! Watermark fill colors.
//!
//! Accepts the notations a color picker hands back: `#rgb`, `#rgba`,
//! `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` and `rgba(r, g, b, a)`, plus a
//! handful of named colors. Always serializes as `rgba(r, g, b, a)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WatermarkError;

/// A straight (non-premultiplied) RGBA color with a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in `0.0..=1.0`.
    pub a: f32,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

impl Default for Color {
    /// Black at 15% opacity.
    fn default() -> Self {
        Self::new(0, 0, 0, 0.15)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for Color {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Color {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = function_args(&s, "rgba").or_else(|| function_args(&s, "rgb")) {
            return parse_functional(args);
        }

        match s.as_str() {
            "black" => Ok(Color::opaque(0, 0, 0)),
            "white" => Ok(Color::opaque(255, 255, 255)),
            "gray" | "grey" => Ok(Color::opaque(128, 128, 128)),
            "red" => Ok(Color::opaque(255, 0, 0)),
            "green" => Ok(Color::opaque(0, 128, 0)),
            "blue" => Ok(Color::opaque(0, 0, 255)),
            "transparent" => Ok(Color::new(0, 0, 0, 0.0)),
            _ => Err(WatermarkError::Config(format!("Unrecognized color '{}'", s))),
        }
    }
}

/// Returns the text between `name(` and the closing `)`.
fn function_args<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_hex(hex: &str) -> Result<Color, WatermarkError> {
    let digit = |i: usize| {
        u8::from_str_radix(&hex[i..i + 1], 16)
            .map(|v| v * 17)
            .map_err(|_| WatermarkError::Config(format!("Invalid hex digit in '#{}'", hex)))
    };
    let pair = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| WatermarkError::Config(format!("Invalid hex digit in '#{}'", hex)))
    };

    if !hex.is_ascii() {
        return Err(WatermarkError::Config(format!("Invalid hex color '#{}'", hex)));
    }

    match hex.len() {
        3 => Ok(Color::opaque(digit(0)?, digit(1)?, digit(2)?)),
        4 => Ok(Color::new(
            digit(0)?,
            digit(1)?,
            digit(2)?,
            digit(3)? as f32 / 255.0,
        )),
        6 => Ok(Color::opaque(pair(0)?, pair(2)?, pair(4)?)),
        8 => Ok(Color::new(
            pair(0)?,
            pair(2)?,
            pair(4)?,
            pair(6)? as f32 / 255.0,
        )),
        n => Err(WatermarkError::Config(format!(
            "Hex color must have 3, 4, 6 or 8 digits, got {}",
            n
        ))),
    }
}

fn parse_functional(args: &str) -> Result<Color, WatermarkError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(WatermarkError::Config(format!(
            "Expected 3 or 4 color components, got {}",
            parts.len()
        )));
    }

    let channel = |s: &str| -> Result<u8, WatermarkError> {
        let v: f32 = s
            .parse()
            .map_err(|_| WatermarkError::Config(format!("Invalid color channel '{}'", s)))?;
        if !(0.0..=255.0).contains(&v) {
            return Err(WatermarkError::Config(format!(
                "Color channel {} out of range 0-255",
                v
            )));
        }
        Ok(v.round() as u8)
    };

    let alpha = match parts.get(3) {
        Some(s) => parse_alpha(s)?,
        None => 1.0,
    };

    Ok(Color::new(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha))
}

fn parse_alpha(s: &str) -> Result<f32, WatermarkError> {
    let (number, scale) = match s.strip_suffix('%') {
        Some(pct) => (pct.trim(), 100.0),
        None => (s, 1.0),
    };
    let v: f32 = number
        .parse()
        .map_err(|_| WatermarkError::Config(format!("Invalid alpha '{}'", s)))?;
    let v = v / scale;
    if !(0.0..=1.0).contains(&v) {
        return Err(WatermarkError::Config(format!("Alpha {} out of range 0-1", v)));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_rgba_default() {
        let c: Color = "rgba(0, 0, 0, 0.15)".parse().unwrap();
        assert_eq!(c, Color::default());
    }

    #[test]
    fn test_parse_rgb() {
        let c: Color = "rgb(255,128, 0)".parse().unwrap();
        assert_eq!(c, Color::opaque(255, 128, 0));
    }

    #[test]
    fn test_parse_percentage_alpha() {
        let c: Color = "rgba(10, 20, 30, 50%)".parse().unwrap();
        assert_eq!(c, Color::new(10, 20, 30, 0.5));
    }

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!("#F00".parse::<Color>().unwrap(), Color::opaque(255, 0, 0));
        assert_eq!("#abc".parse::<Color>().unwrap(), Color::opaque(170, 187, 204));
        assert_eq!("#00ff00".parse::<Color>().unwrap(), Color::opaque(0, 255, 0));
        let c = "#000000ff".parse::<Color>().unwrap();
        assert_eq!(c, Color::opaque(0, 0, 0));
        let c = "#0000".parse::<Color>().unwrap();
        assert!(c.is_transparent());
    }

    #[test]
    fn test_parse_named() {
        assert_eq!("White".parse::<Color>().unwrap(), Color::opaque(255, 255, 255));
        assert!("transparent".parse::<Color>().unwrap().is_transparent());
    }

    #[test]
    fn test_parse_invalid() {
        assert!("#GGG".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("rgba(0, 0, 0, 2)".parse::<Color>().is_err());
        assert!("rgb(300, 0, 0)".parse::<Color>().is_err());
        assert!("rgb(0, 0)".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn test_display_is_css() {
        assert_eq!(Color::default().to_string(), "rgba(0, 0, 0, 0.15)");
    }

    #[test]
    fn test_serde_uses_css_string() {
        let json = serde_json::to_string(&Color::opaque(1, 2, 3)).unwrap();
        assert_eq!(json, "\"rgba(1, 2, 3, 1)\"");
        let back: Color = serde_json::from_str("\"#010203\"").unwrap();
        assert_eq!(back, Color::opaque(1, 2, 3));
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }
}
