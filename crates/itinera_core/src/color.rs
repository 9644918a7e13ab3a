//! Colors and perceptual color math
//!
//! `Color` is a straight-alpha sRGB color with `f32` channels in `0.0..=1.0`.
//! Blending happens in Oklab (via `palette`) so mixing two saturated theme
//! colors does not collapse toward gray the way channel averaging does.

use crate::error::TimelineError;
use palette::{FromColor, LinSrgb, Oklab, Srgb};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum WCAG contrast ratio for normal-size text and strokes
pub const WCAG_AA_CONTRAST: f32 = 4.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const GRAY: Color = Color::rgb(0.5, 0.5, 0.5);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (the leading `#` is optional)
    pub fn parse_hex(s: &str) -> Result<Self, TimelineError> {
        let digits = s.trim().trim_start_matches('#');
        let invalid = || TimelineError::InvalidColor(s.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
        match digits.len() {
            6 => Ok(Self::from_hex(value)),
            8 => Ok(Self::from_hex(value >> 8).with_alpha((value & 0xFF) as f32 / 255.0)),
            _ => Err(invalid()),
        }
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Linear interpolation between two colors in sRGB space
    pub fn lerp(a: &Color, b: &Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
            a: a.a + (b.a - a.a) * t,
        }
    }

    pub fn to_oklab(&self) -> Oklab {
        Oklab::from_color(Srgb::new(self.r, self.g, self.b))
    }

    pub fn from_oklab(lab: Oklab, alpha: f32) -> Color {
        let srgb = Srgb::from_color(lab);
        Color::rgba(
            srgb.red.clamp(0.0, 1.0),
            srgb.green.clamp(0.0, 1.0),
            srgb.blue.clamp(0.0, 1.0),
            alpha,
        )
    }

    /// Even mix of two colors in Oklab
    ///
    /// Component means are computed as `(a + b) * 0.5`, so the result is
    /// bit-for-bit identical regardless of argument order.
    pub fn mix_oklab(a: &Color, b: &Color) -> Color {
        let la = a.to_oklab();
        let lb = b.to_oklab();
        let mixed = Oklab::new(
            (la.l + lb.l) * 0.5,
            (la.a + lb.a) * 0.5,
            (la.b + lb.b) * 0.5,
        );
        Color::from_oklab(mixed, (a.a + b.a) * 0.5)
    }

    /// WCAG 2.1 relative luminance of the opaque color
    pub fn relative_luminance(&self) -> f32 {
        let linear: LinSrgb<f32> = Srgb::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
        .into_linear();
        0.2126 * linear.red + 0.7152 * linear.green + 0.0722 * linear.blue
    }

    /// WCAG contrast ratio against `other`, in `1.0..=21.0`
    pub fn contrast_ratio(&self, other: &Color) -> f32 {
        let l1 = self.relative_luminance();
        let l2 = other.relative_luminance();
        let (hi, lo) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
        (hi + 0.05) / (lo + 0.05)
    }

    /// Black or white, whichever contrasts more with this color
    pub fn contrasting_outline(&self) -> Color {
        if self.contrast_ratio(&Color::BLACK) >= self.contrast_ratio(&Color::WHITE) {
            Color::BLACK
        } else {
            Color::WHITE
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = TimelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}
