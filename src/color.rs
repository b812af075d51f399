//! Colour parsing and conversion for the rasterizer

/// Straight-alpha colour with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Parse `RRGGBBAA` or `RRGGBB` with an optional leading `#`
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let (r, g, b, a) = match hex.len() {
            6 => (channel(0)?, channel(2)?, channel(4)?, 0xFF),
            8 => (channel(0)?, channel(2)?, channel(4)?, channel(6)?),
            _ => return None,
        };
        Some(Self::from_bytes(r, g, b, a))
    }

    pub fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f64 / 255.0,
            g as f64 / 255.0,
            b as f64 / 255.0,
            a as f64 / 255.0,
        )
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "{:02X}{:02X}{:02X}{:02X}",
            byte(self.red),
            byte(self.green),
            byte(self.blue),
            byte(self.alpha)
        )
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    /// Straight-alpha colour for the rasterizer, clamped to range
    pub fn to_skia(&self) -> tiny_skia::Color {
        let c = |v: f64| v.clamp(0.0, 1.0) as f32;
        tiny_skia::Color::from_rgba(c(self.red), c(self.green), c(self.blue), c(self.alpha))
            .unwrap_or(tiny_skia::Color::TRANSPARENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_eight_digit() {
        let c = Rgba::parse("#FF000080").unwrap();
        assert_eq!(c.red, 1.0);
        assert_eq!(c.green, 0.0);
        assert!((c.alpha - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_six_digit_is_opaque() {
        let c = Rgba::parse("00ff00").unwrap();
        assert_eq!(c.alpha, 1.0);
        assert_eq!(c.green, 1.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Rgba::parse("GG000000").is_none());
        assert!(Rgba::parse("12345").is_none());
        assert!(Rgba::parse("ÿÿÿ").is_none());
    }

    #[test]
    fn test_hex_roundtrip_of_parsed_value() {
        assert_eq!(Rgba::parse("1A2B3C4D").unwrap().to_hex(), "1A2B3C4D");
    }

    #[test]
    fn test_skia_color_clamps() {
        let c = Rgba::new(1.5, -0.2, 0.5, 2.0).to_skia();
        assert_eq!(c.red(), 1.0);
        assert_eq!(c.green(), 0.0);
        assert_eq!(c.blue(), 0.5);
        assert_eq!(c.alpha(), 1.0);
    }
}
