//! Fit an encoded raster under a byte budget by lowering quality.

use crate::raster::{codec, Raster};
use crate::types::{Color, OutputFormat};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use tracing::debug;

/// Best encoding found for a byte budget.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedRaster {
    pub bytes: Bytes,
    pub format: OutputFormat,
    /// Quality (0.0 to 1.0) that produced `bytes`.
    pub quality: f32,
    /// Every quality tried, strictly decreasing.
    pub qualities_tried: Vec<f32>,
    pub met_budget: bool,
}

impl OptimizedRaster {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_raster(&self) -> Result<Raster> {
        codec::decode(&self.bytes)
    }
}

/// Linear quality walk: start high, step down by a fixed amount, stop at the
/// first encoding within budget or at the floor.
///
/// Formats without a quality knob (png, webp lossless, bmp, gif) are encoded
/// once at full quality.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeBudgetOptimizer {
    pub start_quality: f32,
    pub step: f32,
    pub min_quality: f32,
    /// Background for formats without alpha.
    pub matte: Color,
}

impl Default for SizeBudgetOptimizer {
    fn default() -> Self {
        Self {
            start_quality: 0.95,
            step: 0.05,
            min_quality: 0.10,
            matte: Color::WHITE,
        }
    }
}

fn percent(q: f32) -> u8 {
    (q * 100.0).round().clamp(1.0, 100.0) as u8
}

impl SizeBudgetOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_quality(mut self, q: f32) -> Self {
        self.start_quality = q;
        self
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub fn with_min_quality(mut self, q: f32) -> Self {
        self.min_quality = q;
        self
    }

    pub fn with_matte(mut self, matte: Color) -> Self {
        self.matte = matte;
        self
    }

    fn check(&self) -> Result<()> {
        let ok = self.step > 0.0
            && self.min_quality > 0.0
            && self.start_quality <= 1.0
            && self.min_quality <= self.start_quality;
        if ok {
            Ok(())
        } else {
            Err(Error::invalid_operation(
                format!(
                    "quality walk {} -> {} by {} is not a decreasing range within (0, 1]",
                    self.start_quality, self.min_quality, self.step
                ),
                ErrorContext::new()
                    .with_field_path("optimizer".to_string())
                    .with_source("raster"),
            ))
        }
    }

    pub fn optimize(&self, raster: &Raster, max_bytes: usize, format: OutputFormat) -> Result<OptimizedRaster> {
        if format.is_vector() {
            return Err(Error::unsupported_format(format.as_str()));
        }
        self.check()?;

        if !format.supports_quality() {
            let bytes = codec::encode(raster.as_image(), format, None, self.matte)?;
            return Ok(OptimizedRaster {
                met_budget: bytes.len() <= max_bytes,
                bytes,
                format,
                quality: 1.0,
                qualities_tried: vec![1.0],
            });
        }

        // Walk in whole percents so float drift never repeats or skips a level.
        let start = percent(self.start_quality);
        let floor = percent(self.min_quality).min(start);
        let step = percent(self.step).max(1);

        let mut tried = Vec::new();
        let mut q = start;
        loop {
            tried.push(q as f32 / 100.0);
            let bytes = codec::encode(raster.as_image(), format, Some(q), self.matte)?;
            debug!(quality = q, bytes = bytes.len(), max_bytes, "optimizer pass");
            let met_budget = bytes.len() <= max_bytes;
            // Over budget at the floor: hand back the floor encoding.
            if met_budget || q <= floor {
                return Ok(OptimizedRaster {
                    bytes,
                    format,
                    quality: q as f32 / 100.0,
                    qualities_tried: tried,
                    met_budget,
                });
            }
            q = q.saturating_sub(step).max(floor);
        }
    }

    /// [`optimize`](Self::optimize) on the blocking pool.
    pub async fn optimize_async(
        &self,
        raster: Raster,
        max_bytes: usize,
        format: OutputFormat,
    ) -> Result<OptimizedRaster> {
        let optimizer = self.clone();
        tokio::task::spawn_blocking(move || optimizer.optimize(&raster, max_bytes, format))
            .await
            .map_err(|e| Error::encode(format!("optimizer task failed: {}", e)))?
    }
}

/// Default linear walk (0.95 down to 0.10 in 0.05 steps).
pub fn optimize_for_budget(raster: &Raster, max_bytes: usize, format: OutputFormat) -> Result<OptimizedRaster> {
    SizeBudgetOptimizer::default().optimize(raster, max_bytes, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn noise(w: u32, h: u32) -> Raster {
        let mut state: u32 = 0x2545_f491;
        Raster::from_image(RgbaImage::from_fn(w, h, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgba([r, g, b, 255])
        }))
    }

    fn is_strictly_decreasing(qs: &[f32]) -> bool {
        qs.windows(2).all(|w| w[0] > w[1])
    }

    #[test]
    fn test_generous_budget_met_first_try() {
        let out = optimize_for_budget(&noise(32, 32), usize::MAX, OutputFormat::Jpeg).unwrap();
        assert!(out.met_budget);
        assert_eq!(out.qualities_tried, vec![0.95]);
        assert_eq!(out.quality, 0.95);
    }

    #[test]
    fn test_impossible_budget_walks_to_floor() {
        let r = noise(64, 64);
        let out = optimize_for_budget(&r, 10, OutputFormat::Jpeg).unwrap();
        assert!(!out.met_budget);
        assert_eq!(out.qualities_tried.len(), 18);
        assert_eq!(out.qualities_tried.first(), Some(&0.95));
        assert_eq!(out.qualities_tried.last(), Some(&0.10));
        assert!(is_strictly_decreasing(&out.qualities_tried));

        let at_floor = r.encode(OutputFormat::Jpeg, Some(10)).unwrap();
        assert_eq!(out.quality, 0.10);
        assert_eq!(out.bytes, at_floor);
    }

    #[test]
    fn test_reachable_budget_is_respected() {
        let r = noise(64, 64);
        let budget = r.encode(OutputFormat::Jpeg, Some(50)).unwrap().len();
        let out = optimize_for_budget(&r, budget, OutputFormat::Jpeg).unwrap();
        assert!(out.met_budget);
        assert!(out.len() <= budget);
        assert!(out.quality >= 0.5);
        assert!(is_strictly_decreasing(&out.qualities_tried));
    }

    #[test]
    fn test_uneven_step_still_tries_floor() {
        let out = SizeBudgetOptimizer::new()
            .with_start_quality(0.9)
            .with_step(0.3)
            .with_min_quality(0.2)
            .optimize(&noise(16, 16), 1, OutputFormat::Jpeg)
            .unwrap();
        assert_eq!(out.qualities_tried, vec![0.9, 0.6, 0.3, 0.2]);
    }

    #[test]
    fn test_lossless_formats_encode_once() {
        let out = optimize_for_budget(&noise(8, 8), 1, OutputFormat::Png).unwrap();
        assert_eq!(out.qualities_tried.len(), 1);
        assert!(!out.met_budget);
        assert!(optimize_for_budget(&noise(8, 8), 1, OutputFormat::Svg).is_err());
    }

    #[test]
    fn test_bad_walk_rejected() {
        let err = SizeBudgetOptimizer::new()
            .with_step(0.0)
            .optimize(&noise(4, 4), 1, OutputFormat::Jpeg)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation { .. }));
    }
}
