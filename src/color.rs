//! RGB colors authored as sRGB hex strings (`#5da4cb`).

use std::fmt;
use std::str::FromStr;

use crate::error::ParseColorError;

/// RGB color with components in [0, 1], stored in sRGB space as authored
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Result<Self, ParseColorError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(hex.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| ParseColorError(hex.to_string()))
        };

        Ok(Self::from_rgb8([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }

    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Self::rgb(
            rgb[0] as f32 / 255.0,
            rgb[1] as f32 / 255.0,
            rgb[2] as f32 / 255.0,
        )
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }

    /// Linear interpolation with GLSL `mix` semantics: `self * (1 - t) + other * t`
    ///
    /// `t` is not clamped, so values outside [0, 1] extrapolate.
    pub fn mix(self, other: Self, t: f32) -> Self {
        let lerp = |a: f32, b: f32| a * (1.0 - t) + b * t;
        Self::rgb(
            lerp(self.r, other.r),
            lerp(self.g, other.g),
            lerp(self.b, other.b),
        )
    }

    /// Convert sRGB components to linear light (for sRGB render targets)
    ///
    /// Components are clamped to [0, 1] first, as a framebuffer write would.
    pub fn to_linear(self) -> Self {
        fn decode(c: f32) -> f32 {
            let c = c.clamp(0.0, 1.0);
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        Self::rgb(decode(self.r), decode(self.g), decode(self.b))
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let linear = self.to_linear();
        wgpu::Color {
            r: linear.r as f64,
            g: linear.g as f64,
            b: linear.b as f64,
            a: 1.0,
        }
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_rgb8();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let color = Color::from_hex("#5da4cb").unwrap();
        assert_eq!(color.to_rgb8(), [0x5d, 0xa4, 0xcb]);
        assert_eq!(color.to_string(), "#5da4cb");

        // Leading '#' is optional
        assert_eq!("4d8bb3".parse::<Color>().unwrap().to_rgb8(), [0x4d, 0x8b, 0xb3]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Color::from_hex("#5da4c").is_err());
        assert!(Color::from_hex("#5da4cbff").is_err());
        assert!(Color::from_hex("#zzzzzz").is_err());
        assert!(Color::from_hex("").is_err());
    }

    #[test]
    fn test_mix_boundaries_are_exact() {
        let a = Color::from_hex("#4d8bb3").unwrap();
        let b = Color::from_hex("#5da4cb").unwrap();

        assert_eq!(a.mix(b, 0.0), a);
        assert_eq!(a.mix(b, 1.0), b);

        let mid = a.mix(b, 0.5);
        assert!((mid.r - (a.r + b.r) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_to_linear_endpoints() {
        assert_eq!(Color::rgb(0.0, 0.0, 0.0).to_linear(), Color::rgb(0.0, 0.0, 0.0));
        let white = Color::WHITE.to_linear();
        assert!((white.r - 1.0).abs() < 1e-6);
        // Mid-grey darkens in linear space
        assert!(Color::rgb(0.5, 0.5, 0.5).to_linear().r < 0.5);
    }

    #[test]
    fn test_to_linear_clamps_out_of_range() {
        let linear = Color::rgb(-0.4, 1.7, 0.5).to_linear();
        assert_eq!(linear.r, 0.0);
        assert_eq!(linear.g, 1.0);
        assert!(linear.b > 0.0 && linear.b < 0.5);
    }
}
