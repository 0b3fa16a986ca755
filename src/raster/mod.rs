//! 栅格处理模块：像素表面、编解码、变换阶段与体积预算优化。
//!
//! # Raster Layer
//!
//! Everything after a generation response comes back: decode the payload into
//! a pixel surface, run it through transform stages, and re-encode it for export.
//!
//! ```text
//! payload bytes → decode → Raster → Stage → Stage → … → encode → export bytes
//!                  (async)          └──── Pipeline ────┘         (async)
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Raster`] | Immutable-by-convention RGBA surface; every stage returns a new one |
//! | [`codec`] | Decode/encode, matting for formats without alpha |
//! | [`ops`] | The individual transforms (resize, pad, border, filter, …) |
//! | [`Pipeline`] | Ordered, reusable stage list executed in one pass |
//! | [`SizeBudgetOptimizer`] | Lower encode quality until the output fits a byte budget |
//!
//! ## Example
//!
//! ```rust,no_run
//! use qrgen_client::raster::{Interpolation, Pipeline, Raster};
//! use qrgen_client::types::{Color, OutputFormat};
//!
//! # fn demo(png: &[u8]) -> qrgen_client::Result<()> {
//! let raster = Raster::decode(png)?;
//! let pipeline = Pipeline::builder()
//!     .resize(600, 600, true, Interpolation::Nearest)
//!     .pad(24, Color::WHITE)
//!     .convert(OutputFormat::Jpeg, Some(90))
//!     .build();
//! let out = pipeline.execute(&raster)?;
//! let bytes = out.encode(OutputFormat::Jpeg, Some(90))?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

pub mod codec;
mod font;
pub mod ops;
pub mod optimize;
pub mod pipeline;

pub use ops::{
    BorderStyle, FilterKind, FontSpec, Interpolation, Layer, LayerSource, WatermarkPosition,
    WatermarkSpec,
};
pub use optimize::{optimize_for_budget, OptimizedRaster, SizeBudgetOptimizer};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineOperation, Stage};

use crate::types::{Color, OutputFormat};
use crate::{Error, Result};
use bytes::Bytes;
use image::RgbaImage;

/// In-memory RGBA pixel surface.
///
/// Stages never mutate their input; they build and return a new `Raster`.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    image: RgbaImage,
    source_format: Option<OutputFormat>,
}

impl Raster {
    /// Solid surface of the given size.
    pub fn new(width: u32, height: u32, fill: Color) -> Self {
        Self::from_image(RgbaImage::from_pixel(width, height, fill.into()))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image,
            source_format: None,
        }
    }

    /// Wrap raw RGBA8 bytes (row-major, 4 bytes per pixel).
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        RgbaImage::from_raw(width, height, data)
            .map(Self::from_image)
            .ok_or_else(|| Error::decode(format!("pixel buffer does not match {}x{}", width, height)))
    }

    pub(crate) fn with_source_format(mut self, format: Option<OutputFormat>) -> Self {
        self.source_format = format;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Format the surface was decoded from (or last converted to), if known.
    pub fn source_format(&self) -> Option<OutputFormat> {
        self.source_format
    }

    /// Pixel at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width() && y < self.height() {
            Some((*self.image.get_pixel(x, y)).into())
        } else {
            None
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Count of pixels with alpha == 0.
    pub fn transparent_pixel_count(&self) -> usize {
        self.image.pixels().filter(|p| p.0[3] == 0).count()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }

    /// Decode off the async executor.
    pub async fn decode_async(bytes: Bytes) -> Result<Self> {
        tokio::task::spawn_blocking(move || codec::decode(&bytes))
            .await
            .map_err(|e| Error::decode(format!("decode task failed: {}", e)))?
    }

    /// Encode to `format`. `quality` (1-100) applies to lossy formats only.
    pub fn encode(&self, format: OutputFormat, quality: Option<u8>) -> Result<Bytes> {
        codec::encode(&self.image, format, quality, Color::WHITE)
    }

    /// Encode off the async executor.
    pub async fn encode_async(self, format: OutputFormat, quality: Option<u8>) -> Result<Bytes> {
        tokio::task::spawn_blocking(move || self.encode(format, quality))
            .await
            .map_err(|e| Error::encode(format!("encode task failed: {}", e)))?
    }
}
