//! RGBA color with 8-bit components.

/// Color with 8-bit components. Structural equality is used directly for
/// material deduplication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Opaque color from components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color from components with alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Color from float components in [0, 1].
    pub fn from_floats(r: f64, g: f64, b: f64) -> Self {
        Self::rgb(
            component_from_float(r),
            component_from_float(g),
            component_from_float(b),
        )
    }

    /// Components as floats in [0, 1], alpha dropped.
    pub fn to_floats(self) -> [f64; 3] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        ]
    }

    /// Parse a `rrggbb` or `rrggbbaa` hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Format as a `rrggbb` hex string.
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Clamp and quantize a float component in [0, 1].
pub fn component_from_float(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_conversion() {
        assert_eq!(Color::from_floats(1.0, 0.0, 0.5), Color::rgb(255, 0, 128));
        assert_eq!(component_from_float(-1.0), 0);
        assert_eq!(component_from_float(2.0), 255);
    }

    #[test]
    fn test_hex() {
        assert_eq!(Color::from_hex("ff8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::from_hex("#00ff00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(Color::from_hex("bogus"), None);
        assert_eq!(Color::rgb(255, 128, 0).to_hex(), "ff8000");
    }
}
