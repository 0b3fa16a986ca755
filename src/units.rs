//! Pixel/physical size conversion and print-size guidance.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest printed side that scans reliably, in centimeters.
pub const MIN_PRINT_SIZE_CM: f64 = 2.0;

/// Printed side length as a fraction of the intended scan distance.
pub const SCAN_DISTANCE_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalUnit {
    #[serde(alias = "in")]
    Inches,
    #[serde(alias = "cm")]
    Centimeters,
    #[serde(alias = "mm")]
    Millimeters,
    #[serde(alias = "pt")]
    Points,
}

impl PhysicalUnit {
    /// How many of this unit make one inch.
    pub fn per_inch(&self) -> f64 {
        match self {
            PhysicalUnit::Inches => 1.0,
            PhysicalUnit::Centimeters => 2.54,
            PhysicalUnit::Millimeters => 25.4,
            PhysicalUnit::Points => 72.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            PhysicalUnit::Inches => "in",
            PhysicalUnit::Centimeters => "cm",
            PhysicalUnit::Millimeters => "mm",
            PhysicalUnit::Points => "pt",
        }
    }
}

impl fmt::Display for PhysicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PhysicalUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "inch" | "inches" => Ok(PhysicalUnit::Inches),
            "cm" | "centimeter" | "centimeters" => Ok(PhysicalUnit::Centimeters),
            "mm" | "millimeter" | "millimeters" => Ok(PhysicalUnit::Millimeters),
            "pt" | "point" | "points" => Ok(PhysicalUnit::Points),
            other => Err(Error::validation_with_context(
                format!("unknown unit '{}'", other),
                ErrorContext::new().with_field_path("unit".to_string()),
            )),
        }
    }
}

fn positive(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::validation_with_context(
            format!("{} must be a positive number, got {}", name, value),
            ErrorContext::new()
                .with_field_path(name.to_string())
                .with_source("units"),
        ))
    }
}

/// Convert a length between units.
pub fn convert(value: f64, from: PhysicalUnit, to: PhysicalUnit) -> f64 {
    value / from.per_inch() * to.per_inch()
}

pub fn pixels_to_physical(px: f64, dpi: f64, unit: PhysicalUnit) -> Result<f64> {
    let px = positive("pixels", px)?;
    let dpi = positive("dpi", dpi)?;
    Ok(px / dpi * unit.per_inch())
}

/// Pixels needed to print `size` at `dpi`, rounded to the nearest whole pixel (at least 1).
pub fn physical_to_pixels(size: f64, unit: PhysicalUnit, dpi: f64) -> Result<u32> {
    let size = positive("size", size)?;
    let dpi = positive("dpi", dpi)?;
    let px = (size / unit.per_inch() * dpi).round();
    Ok(px.clamp(1.0, u32::MAX as f64) as u32)
}

/// Smallest printed side for a code scanned from `scan_distance` (both in `unit`):
/// a tenth of the distance, never below 2 cm.
pub fn minimum_print_size(scan_distance: f64, unit: PhysicalUnit) -> Result<f64> {
    let distance = positive("scan_distance", scan_distance)?;
    let floor = convert(MIN_PRINT_SIZE_CM, PhysicalUnit::Centimeters, unit);
    Ok((distance * SCAN_DISTANCE_RATIO).max(floor))
}
