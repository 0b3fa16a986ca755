//! Raster transform stages.
//!
//! Each function borrows its input and returns a fresh [`Raster`]. Usage
//! errors (zero sizes, out-of-bounds crops, bad intensities) are reported as
//! [`Error::InvalidOperation`], never clamped silently.

use crate::raster::{codec, font, Raster};
use crate::types::{Color, OutputFormat};
use crate::{Error, ErrorContext, Result};
use image::imageops::{self, FilterType};
use image::{Pixel, Rgba, RgbaImage};
use std::borrow::Cow;
use std::sync::Arc;

fn invalid(stage: &str, msg: impl Into<String>) -> Error {
    Error::invalid_operation(
        msg,
        ErrorContext::new()
            .with_field_path(stage.to_string())
            .with_source("raster"),
    )
}

fn derived(input: &Raster, image: RgbaImage) -> Raster {
    Raster::from_image(image).with_source_format(input.source_format())
}

fn grown(input: &Raster, stage: &str, amount: u32) -> Result<(u32, u32)> {
    let extra = amount
        .checked_mul(2)
        .ok_or_else(|| invalid(stage, "amount overflows surface size"))?;
    match (input.width().checked_add(extra), input.height().checked_add(extra)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(invalid(stage, "amount overflows surface size")),
    }
}

// ---------------------------------------------------------------------------
// ConvertFormat
// ---------------------------------------------------------------------------

/// Re-encode through `format` and decode again, so the surface carries that
/// format's losses. Formats without alpha are matted onto `matte`.
pub fn convert(input: &Raster, format: OutputFormat, quality: Option<u8>, matte: Color) -> Result<Raster> {
    let bytes = codec::encode(input.as_image(), format, quality, matte)?;
    codec::decode(&bytes)
}

// ---------------------------------------------------------------------------
// Resize
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Hard edges; keeps QR modules crisp.
    #[default]
    Nearest,
    Smooth,
}

impl Interpolation {
    fn filter(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Smooth => FilterType::Lanczos3,
        }
    }
}

/// Largest size with the source's aspect ratio that fits inside the box.
pub fn fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let scale = (bounds.0 as f64 / sw).min(bounds.1 as f64 / sh);
    (
        ((sw * scale).round() as u32).max(1),
        ((sh * scale).round() as u32).max(1),
    )
}

pub fn resize(
    input: &Raster,
    width: u32,
    height: u32,
    maintain_aspect: bool,
    interpolation: Interpolation,
) -> Result<Raster> {
    if width == 0 || height == 0 {
        return Err(invalid("resize", format!("target size {}x{} must be positive", width, height)));
    }
    if input.width() == 0 || input.height() == 0 {
        return Err(invalid("resize", "cannot resize an empty surface"));
    }
    let (w, h) = if maintain_aspect {
        fit_dimensions(input.dimensions(), (width, height))
    } else {
        (width, height)
    };
    if (w, h) == input.dimensions() {
        return Ok(input.clone());
    }
    Ok(derived(
        input,
        imageops::resize(input.as_image(), w, h, interpolation.filter()),
    ))
}

// ---------------------------------------------------------------------------
// Pad
// ---------------------------------------------------------------------------

pub fn pad(input: &Raster, amount: u32, color: Color) -> Result<Raster> {
    if amount == 0 {
        return Ok(input.clone());
    }
    let (w, h) = grown(input, "pad", amount)?;
    let mut canvas = RgbaImage::from_pixel(w, h, color.into());
    imageops::replace(&mut canvas, input.as_image(), amount as i64, amount as i64);
    Ok(derived(input, canvas))
}

// ---------------------------------------------------------------------------
// Border
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl BorderStyle {
    /// (on, off) run lengths in multiples of the border width.
    fn pattern(self) -> Option<(u32, u32)> {
        match self {
            BorderStyle::Solid => None,
            BorderStyle::Dashed => Some((3, 2)),
            BorderStyle::Dotted => Some((1, 1)),
        }
    }
}

/// Surround the content with a `width`-pixel outline. Gaps in dashed and
/// dotted outlines stay transparent.
pub fn border(input: &Raster, width: u32, color: Color, style: BorderStyle) -> Result<Raster> {
    if width == 0 {
        return Ok(input.clone());
    }
    let (iw, ih) = input.dimensions();
    let (ow, oh) = grown(input, "border", width)?;
    let mut canvas = RgbaImage::new(ow, oh);
    imageops::replace(&mut canvas, input.as_image(), width as i64, width as i64);

    let ink: Rgba<u8> = color.into();
    for y in 0..oh {
        let horizontal_edge = y < width || y >= width + ih;
        for x in 0..ow {
            if !(horizontal_edge || x < width || x >= width + iw) {
                continue;
            }
            let along = if horizontal_edge { x } else { y };
            let on = match style.pattern() {
                None => true,
                Some((on, off)) => (along / width) % (on + off) < on,
            };
            if on {
                canvas.put_pixel(x, y, ink);
            }
        }
    }
    Ok(derived(input, canvas))
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Pixel filters. How `intensity` is read depends on the kind:
///
/// | Kind | `intensity` |
/// |------|-------------|
/// | `Grayscale`, `Sepia`, `Invert` | blend amount, 0 = unchanged, 1 (or more) = full effect |
/// | `Blur` | gaussian sigma in pixels |
/// | `Brightness` | channel multiplier, 1 = unchanged |
/// | `Contrast` | multiplier around mid-grey, 1 = unchanged |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Grayscale,
    Sepia,
    Invert,
    Blur,
    Brightness,
    Contrast,
}

fn channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn lerp(from: [f32; 3], to: [f32; 3], t: f32) -> [f32; 3] {
    [
        from[0] + (to[0] - from[0]) * t,
        from[1] + (to[1] - from[1]) * t,
        from[2] + (to[2] - from[2]) * t,
    ]
}

pub fn filter(input: &Raster, kind: FilterKind, intensity: f32) -> Result<Raster> {
    if !intensity.is_finite() || intensity < 0.0 {
        return Err(invalid("filter", format!("intensity {} must be a non-negative number", intensity)));
    }
    if kind == FilterKind::Blur {
        if intensity == 0.0 {
            return Ok(input.clone());
        }
        return Ok(derived(input, imageops::blur(input.as_image(), intensity)));
    }

    let t = intensity.min(1.0);
    let mut out = input.as_image().clone();
    for p in out.pixels_mut() {
        let [r, g, b, a] = p.0;
        let rgb = [r as f32, g as f32, b as f32];
        let [nr, ng, nb] = match kind {
            FilterKind::Grayscale => {
                let l = 0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2];
                lerp(rgb, [l, l, l], t)
            }
            FilterKind::Sepia => {
                let sepia = [
                    0.393 * rgb[0] + 0.769 * rgb[1] + 0.189 * rgb[2],
                    0.349 * rgb[0] + 0.686 * rgb[1] + 0.168 * rgb[2],
                    0.272 * rgb[0] + 0.534 * rgb[1] + 0.131 * rgb[2],
                ];
                lerp(rgb, sepia, t)
            }
            FilterKind::Invert => lerp(rgb, [255.0 - rgb[0], 255.0 - rgb[1], 255.0 - rgb[2]], t),
            FilterKind::Brightness => rgb.map(|c| c * intensity),
            FilterKind::Contrast => rgb.map(|c| (c - 128.0) * intensity + 128.0),
            FilterKind::Blur => rgb,
        };
        p.0 = [channel(nr), channel(ng), channel(nb), a];
    }
    Ok(derived(input, out))
}

// ---------------------------------------------------------------------------
// Crop
// ---------------------------------------------------------------------------

pub fn crop(input: &Raster, x: u32, y: u32, width: u32, height: u32) -> Result<Raster> {
    let (iw, ih) = input.dimensions();
    let fits = width > 0
        && height > 0
        && x.checked_add(width).is_some_and(|right| right <= iw)
        && y.checked_add(height).is_some_and(|bottom| bottom <= ih);
    if !fits {
        return Err(invalid(
            "crop",
            format!(
                "region {}x{} at ({}, {}) is outside the {}x{} surface",
                width, height, x, y, iw, ih
            ),
        ));
    }
    Ok(derived(
        input,
        imageops::crop_imm(input.as_image(), x, y, width, height).to_image(),
    ))
}

// ---------------------------------------------------------------------------
// Rotate
// ---------------------------------------------------------------------------

/// Bounding box of a `width`x`height` surface rotated by `degrees`.
pub fn rotated_dimensions(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let turn = degrees.rem_euclid(360.0);
    if turn == 0.0 || turn == 180.0 {
        return (width, height);
    }
    if turn == 90.0 || turn == 270.0 {
        return (height, width);
    }
    let (sin, cos) = (turn as f64).to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let (w, h) = (width as f64, height as f64);
    // Small epsilon keeps float noise from adding a pixel.
    let bw = (w * cos + h * sin - 1e-6).ceil().max(1.0) as u32;
    let bh = (w * sin + h * cos - 1e-6).ceil().max(1.0) as u32;
    (bw, bh)
}

/// Rotate clockwise about the center. The surface grows to the rotated
/// bounding box; uncovered corners are transparent.
pub fn rotate(input: &Raster, degrees: f32) -> Result<Raster> {
    if !degrees.is_finite() {
        return Err(invalid("rotate", "angle must be finite"));
    }
    let turn = degrees.rem_euclid(360.0);
    let src = input.as_image();
    if turn == 0.0 {
        return Ok(input.clone());
    } else if turn == 90.0 {
        return Ok(derived(input, imageops::rotate90(src)));
    } else if turn == 180.0 {
        return Ok(derived(input, imageops::rotate180(src)));
    } else if turn == 270.0 {
        return Ok(derived(input, imageops::rotate270(src)));
    }

    let (sw, sh) = input.dimensions();
    let (dw, dh) = rotated_dimensions(sw, sh, turn);
    let (sin, cos) = (turn as f64).to_radians().sin_cos();
    let (scx, scy) = (sw as f64 / 2.0, sh as f64 / 2.0);
    let (dcx, dcy) = (dw as f64 / 2.0, dh as f64 / 2.0);

    let out = RgbaImage::from_fn(dw, dh, |x, y| {
        let dx = x as f64 + 0.5 - dcx;
        let dy = y as f64 + 0.5 - dcy;
        let sx = dx * cos + dy * sin + scx;
        let sy = -dx * sin + dy * cos + scy;
        if sx >= 0.0 && sy >= 0.0 && sx < sw as f64 && sy < sh as f64 {
            *src.get_pixel(sx as u32, sy as u32)
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    Ok(derived(input, out))
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

/// Where a composite layer takes its pixels from.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSource {
    /// The raster the stage is applied to.
    Input,
    Image(Arc<Raster>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub source: LayerSource,
    pub x: i64,
    pub y: i64,
    /// Explicit draw size; a missing side keeps the layer's aspect ratio.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Layer {
    pub fn input(x: i64, y: i64) -> Self {
        Self {
            source: LayerSource::Input,
            x,
            y,
            width: None,
            height: None,
        }
    }

    pub fn image(raster: impl Into<Arc<Raster>>, x: i64, y: i64) -> Self {
        Self {
            source: LayerSource::Image(raster.into()),
            x,
            y,
            width: None,
            height: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    fn draw_size(&self, src: &Raster) -> (u32, u32) {
        let (sw, sh) = src.dimensions();
        let scaled = |num: u32, of: u32, den: u32| {
            ((of as f64 * num as f64 / den.max(1) as f64).round() as u32).max(1)
        };
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scaled(w, sh, sw)),
            (None, Some(h)) => (scaled(h, sw, sh), h),
            (None, None) => (sw, sh),
        }
    }
}

/// Paint `layers` in order onto a fresh `width`x`height` surface filled with
/// `background`. Later layers draw over earlier ones with alpha blending.
pub fn composite(
    input: &Raster,
    layers: &[Layer],
    width: u32,
    height: u32,
    background: Color,
) -> Result<Raster> {
    if width == 0 || height == 0 {
        return Err(invalid("composite", format!("canvas {}x{} must be positive", width, height)));
    }
    let mut canvas = RgbaImage::from_pixel(width, height, background.into());
    for (i, layer) in layers.iter().enumerate() {
        let src: &Raster = match &layer.source {
            LayerSource::Input => input,
            LayerSource::Image(r) => r.as_ref(),
        };
        let (lw, lh) = layer.draw_size(src);
        if lw == 0 || lh == 0 {
            return Err(invalid("composite", format!("layer {} has an empty draw size", i)));
        }
        let pixels: Cow<'_, RgbaImage> = if (lw, lh) == src.dimensions() {
            Cow::Borrowed(src.as_image())
        } else {
            Cow::Owned(imageops::resize(src.as_image(), lw, lh, FilterType::Triangle))
        };
        imageops::overlay(&mut canvas, &*pixels, layer.x, layer.y);
    }
    Ok(Raster::from_image(canvas))
}

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSpec {
    /// Cap height target in pixels; rounded to a whole multiple of the 7-pixel glyph.
    pub size_px: u32,
    pub bold: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            size_px: 14,
            bold: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub text: String,
    pub position: WatermarkPosition,
    pub font: FontSpec,
    pub color: Color,
    /// 0.0 to 1.0, multiplied into the color's own alpha.
    pub opacity: f32,
    pub padding: u32,
}

impl WatermarkSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: WatermarkPosition::default(),
            font: FontSpec::default(),
            color: Color::BLACK,
            opacity: 0.5,
            padding: 10,
        }
    }

    pub fn with_position(mut self, position: WatermarkPosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_font(mut self, size_px: u32, bold: bool) -> Self {
        self.font = FontSpec { size_px, bold };
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }
}

/// Draw text at an anchor. The font steps down in size when the measured
/// text would not fit inside the padded surface.
pub fn watermark(input: &Raster, spec: &WatermarkSpec) -> Result<Raster> {
    if !(0.0..=1.0).contains(&spec.opacity) {
        return Err(invalid("watermark", format!("opacity {} must be within 0..=1", spec.opacity)));
    }
    if spec.text.is_empty() || spec.opacity == 0.0 {
        return Ok(input.clone());
    }

    let (iw, ih) = input.dimensions();
    let bold = spec.font.bold;
    let pad = spec.padding;
    let avail_w = iw.saturating_sub(pad.saturating_mul(2));
    let avail_h = ih.saturating_sub(pad.saturating_mul(2));

    let mut scale = ((spec.font.size_px as f32 / font::GLYPH_HEIGHT as f32).round() as u32).max(1);
    while scale > 1 {
        let (tw, th) = font::measure(&spec.text, scale, bold);
        if tw <= avail_w && th <= avail_h {
            break;
        }
        scale -= 1;
    }
    let (tw, th) = font::measure(&spec.text, scale, bold);

    let x0 = match spec.position {
        WatermarkPosition::TopLeft | WatermarkPosition::BottomLeft => pad,
        WatermarkPosition::TopRight | WatermarkPosition::BottomRight => {
            iw.saturating_sub(tw.saturating_add(pad))
        }
        WatermarkPosition::Center => iw.saturating_sub(tw) / 2,
    };
    let y0 = match spec.position {
        WatermarkPosition::TopLeft | WatermarkPosition::TopRight => pad,
        WatermarkPosition::BottomLeft | WatermarkPosition::BottomRight => {
            ih.saturating_sub(th.saturating_add(pad))
        }
        WatermarkPosition::Center => ih.saturating_sub(th) / 2,
    };
    // Keep the text on the surface even when padding alone would push it off.
    let x0 = x0.min(iw.saturating_sub(tw));
    let y0 = y0.min(ih.saturating_sub(th));

    // Coverage mask first so bold strokes never blend twice.
    let mut mask = vec![false; (tw as usize) * (th as usize)];
    let advance = (font::GLYPH_WIDTH + font::GLYPH_SPACING) * scale;
    let stroke = if bold { 2 * scale } else { scale };
    for (i, c) in spec.text.chars().enumerate() {
        let gx = i as u32 * advance;
        for row in 0..font::GLYPH_HEIGHT {
            for col in 0..font::GLYPH_WIDTH {
                if !font::ink(c, col, row) {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..stroke {
                        let mx = gx + col * scale + dx;
                        let my = row * scale + dy;
                        if mx < tw && my < th {
                            mask[(my * tw + mx) as usize] = true;
                        }
                    }
                }
            }
        }
    }

    let alpha = channel(spec.color.a as f32 * spec.opacity);
    let ink = Rgba([spec.color.r, spec.color.g, spec.color.b, alpha]);
    let mut out = input.as_image().clone();
    for my in 0..th {
        for mx in 0..tw {
            if !mask[(my * tw + mx) as usize] {
                continue;
            }
            let (px, py) = (x0 + mx, y0 + my);
            if px < iw && py < ih {
                out.get_pixel_mut(px, py).blend(&ink);
            }
        }
    }
    Ok(derived(input, out))
}
