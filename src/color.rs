//! Opaque color values as delivered by the color picker.

use std::fmt;

use palette::{LinSrgb, Srgb};
use serde::{Deserialize, Serialize};

/// A color string as produced by the picker (typically `#rrggbb`).
///
/// The value is carried through the configuration and geometry untouched.
/// Only the preview surface ever interprets it, see [`ColorValue::to_srgb`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorValue(String);

impl ColorValue {
    /// The picker's initial color.
    pub const DEFAULT_HEX: &'static str = "#d48fa7";

    /// Wraps a color string without validating it.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the color string as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the value as a hex color (`#rgb` or `#rrggbb`, `#` optional).
    ///
    /// Returns `None` for anything else. Callers decide how to draw an
    /// unparseable color; this type never rejects one.
    pub fn to_srgb(&self) -> Option<Srgb<u8>> {
        self.0.trim().parse::<Srgb<u8>>().ok()
    }
}

impl Default for ColorValue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HEX)
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColorValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ColorValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scales an sRGB color by `factor` in linear light and converts back.
///
/// Used for shading: a factor of 1.0 leaves the color unchanged, values
/// above 1.0 saturate at white.
pub fn shade(color: Srgb<u8>, factor: f32) -> Srgb<u8> {
    let linear: LinSrgb = color.into_format::<f32>().into_linear();
    let lit = LinSrgb::new(
        (linear.red * factor).clamp(0.0, 1.0),
        (linear.green * factor).clamp(0.0, 1.0),
        (linear.blue * factor).clamp(0.0, 1.0),
    );
    Srgb::<f32>::from_linear(lit).into_format::<u8>()
}

/// Formats an sRGB color as `#rrggbb`.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_hash() {
        let color = ColorValue::new("#d48fa7").to_srgb().unwrap();
        assert_eq!((color.red, color.green, color.blue), (0xd4, 0x8f, 0xa7));

        let bare = ColorValue::new("000000").to_srgb().unwrap();
        assert_eq!((bare.red, bare.green, bare.blue), (0, 0, 0));
    }

    #[test]
    fn malformed_color_is_kept_verbatim() {
        let color = ColorValue::new("not a color");
        assert!(color.to_srgb().is_none());
        assert_eq!(color.as_str(), "not a color");
    }

    #[test]
    fn shade_identity_and_extremes() {
        let base = Srgb::new(200u8, 100, 50);
        let same = shade(base, 1.0);
        // Round trip through linear light may drift by one step.
        assert!((same.red as i16 - 200).abs() <= 1);
        assert!((same.green as i16 - 100).abs() <= 1);

        let black = shade(base, 0.0);
        assert_eq!((black.red, black.green, black.blue), (0, 0, 0));

        let darker = shade(base, 0.5);
        assert!(darker.red < base.red);
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(to_hex(Srgb::new(255u8, 0, 16)), "#ff0010");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&ColorValue::new("#000000")).unwrap();
        assert_eq!(json, "\"#000000\"");
    }
}
