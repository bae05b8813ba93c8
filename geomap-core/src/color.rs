//! RGB colors and the fixed palettes offered to users.

use crate::error::{GeomapError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An opaque RGB color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation in RGB space, `t` clamped to [0, 1].
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = GeomapError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || GeomapError::InvalidColor(s.to_string());
        let channel = |i: usize, width: usize| -> Result<u8> {
            let part = hex.get(i..i + width).ok_or_else(bad)?;
            let value = u8::from_str_radix(part, 16).map_err(|_| bad())?;
            Ok(if width == 1 { value * 17 } else { value })
        };
        match hex.len() {
            6 => Ok(Color::rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
            3 => Ok(Color::rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The named colors offered for categories and vector ramps, in menu order.
pub const NAMED_COLORS: [(&str, Color); 12] = [
    ("Purple", Color::rgb(0x80, 0x00, 0xff)),
    ("Blue", Color::rgb(0x00, 0xbf, 0xff)),
    ("Green", Color::rgb(0x00, 0xff, 0x80)),
    ("Yellow", Color::rgb(0xff, 0xf2, 0x00)),
    ("Orange", Color::rgb(0xff, 0x99, 0x00)),
    ("Red", Color::rgb(0xff, 0x00, 0x00)),
    ("Pink", Color::rgb(0xff, 0x00, 0xaa)),
    ("Gray", Color::rgb(0x7d, 0x7d, 0x7d)),
    ("White", Color::rgb(0xff, 0xff, 0xff)),
    ("Cyan", Color::rgb(0x00, 0xff, 0xff)),
    ("Brown", Color::rgb(0x85, 0x59, 0x44)),
    ("Olive", Color::rgb(0x5e, 0x78, 0x32)),
];

/// Default ramp for vector coordinate layers: red through purple.
pub const DEFAULT_VECTOR_RAMP: [Color; 6] = [
    Color::rgb(0xff, 0x00, 0x00),
    Color::rgb(0xff, 0x99, 0x00),
    Color::rgb(0xff, 0xf2, 0x00),
    Color::rgb(0x00, 0xff, 0x80),
    Color::rgb(0x00, 0xbf, 0xff),
    Color::rgb(0x80, 0x00, 0xff),
];

/// Named continuous ramps for numeric choropleths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Palette {
    #[default]
    Viridis,
    Plasma,
    Inferno,
}

impl Palette {
    pub const ALL: [Palette; 3] = [Palette::Viridis, Palette::Plasma, Palette::Inferno];

    /// Anchor colors, evenly spaced from low to high.
    pub fn anchors(&self) -> Vec<Color> {
        let hex: &[&str] = match self {
            Palette::Viridis => &["#440154", "#3b528b", "#21918c", "#5ec962", "#fde725"],
            Palette::Plasma => &["#0d0887", "#7e03a8", "#cc4778", "#f89540", "#f0f921"],
            Palette::Inferno => &["#000004", "#56106e", "#bb3754", "#f98e09", "#fcffa4"],
        };
        hex.iter().filter_map(|h| h.parse().ok()).collect()
    }
}
