//! RGBA colors parsed from hex notation.

use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// `#RRGGBB`, the only form accepted for generation colors.
pub(crate) static HEX_TRIPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());

/// `#RRGGBB` or `#RRGGBBAA`, accepted for raster colors.
static HEX_RGBA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9A-Fa-f]{6})([0-9A-Fa-f]{2})?$").unwrap());

pub fn is_hex_triple(s: &str) -> bool {
    HEX_TRIPLE.is_match(s)
}

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let caps = HEX_RGBA.captures(s.trim()).ok_or_else(|| {
            Error::validation_with_context(
                format!("invalid hex color '{}'", s),
                ErrorContext::new()
                    .with_details("expected #RRGGBB or #RRGGBBAA")
                    .with_source("color"),
            )
        })?;
        let rgb = &caps[1];
        let channel = |i: usize| u8::from_str_radix(&rgb[i..i + 2], 16).unwrap_or(0);
        let a = caps
            .get(2)
            .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
            .unwrap_or(255);
        Ok(Self::rgba(channel(0), channel(2), channel(4), a))
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn with_alpha(mut self, a: u8) -> Self {
        self.a = a;
        self
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(c: Color) -> Self {
        image::Rgba([c.r, c.g, c.b, c.a])
    }
}

impl From<image::Rgba<u8>> for Color {
    fn from(p: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = p.0;
        Self { r, g, b, a }
    }
}
