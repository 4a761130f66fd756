//! Static palette for tab highlighting and the path-to-color mapping.
//!
//! A path is hashed with 32-bit FNV-1a over its UTF-8 bytes and reduced
//! modulo the palette length. The same path always lands on the same entry
//! for a given build.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// A 24-bit RGB color, rendered as `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u32);

impl Color {
    pub const fn from_rgb(rgb: u32) -> Self {
        Self(rgb & 0x00ff_ffff)
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseColorError {
    #[error("expected 6 hex digits, got {0:?}")]
    InvalidLength(String),
    #[error("invalid hex digits in {0:?}")]
    InvalidDigits(String),
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let digits = input.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);

        if digits.len() != 6 {
            return Err(ParseColorError::InvalidLength(input.to_string()));
        }
        if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(ParseColorError::InvalidDigits(input.to_string()));
        }

        u32::from_str_radix(digits, 16)
            .map(Color::from_rgb)
            .map_err(|_| ParseColorError::InvalidDigits(input.to_string()))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

const PALETTE: [Color; 25] = [
    Color::from_rgb(0xFF0000), // red
    Color::from_rgb(0x00FF00), // green
    Color::from_rgb(0x0000FF), // blue
    Color::from_rgb(0xFFFF00), // yellow
    Color::from_rgb(0x00FFFF), // cyan
    Color::from_rgb(0xFF00FF), // magenta
    Color::from_rgb(0xC0C0C0), // silver
    Color::from_rgb(0xFF7F50), // coral
    Color::from_rgb(0x6495ED), // cornflower blue
    Color::from_rgb(0xDC143C), // crimson
    Color::from_rgb(0x008B8B), // dark cyan
    Color::from_rgb(0xFF8C00), // dark orange
    Color::from_rgb(0x9932CC), // dark orchid
    Color::from_rgb(0xFF1493), // deep pink
    Color::from_rgb(0x00BFFF), // deep sky blue
    Color::from_rgb(0xFFD700), // gold
    Color::from_rgb(0xFF6347), // tomato
    Color::from_rgb(0xFF4500), // orange red
    Color::from_rgb(0xFFFFE0), // light yellow
    Color::from_rgb(0xADD8E6), // light blue
    Color::from_rgb(0xD3D3D3), // light gray
    Color::from_rgb(0x90EE90), // light green
    Color::from_rgb(0xFFB6C1), // light pink
    Color::from_rgb(0xF0E68C), // khaki
    Color::from_rgb(0xFFDEAD), // navajo white
];

/// The fixed palette, in assignment order.
pub fn palette() -> &'static [Color] {
    &PALETTE
}

/// FNV-1a (32-bit) over raw bytes.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Index into [`palette`] chosen for `path`.
#[inline]
pub fn index_for_path(path: &str) -> usize {
    (fnv1a(path.as_bytes()) as usize) % PALETTE.len()
}

/// Returns the tab color for the provided file path.
///
/// Total over all strings. The empty path hashes to the FNV offset basis and
/// therefore always maps to `#FF8C00`.
#[inline]
pub fn color_for_path(path: &str) -> Color {
    PALETTE[index_for_path(path)]
}
