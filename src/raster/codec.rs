//! Raster decode/encode.
//!
//! Formats without an alpha channel (jpeg, bmp) are matted onto an opaque
//! background first, so transparent pixels come out as the matte color and
//! never as black.

use crate::raster::Raster;
use crate::types::{Color, OutputFormat};
use crate::{Error, Result};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// JPEG quality used when the caller passes none.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

fn image_format(format: OutputFormat) -> Option<ImageFormat> {
    match format {
        OutputFormat::Png => Some(ImageFormat::Png),
        OutputFormat::Jpeg => Some(ImageFormat::Jpeg),
        OutputFormat::Webp => Some(ImageFormat::WebP),
        OutputFormat::Bmp => Some(ImageFormat::Bmp),
        OutputFormat::Gif => Some(ImageFormat::Gif),
        OutputFormat::Svg => None,
    }
}

fn output_format(format: ImageFormat) -> Option<OutputFormat> {
    match format {
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::WebP => Some(OutputFormat::Webp),
        ImageFormat::Bmp => Some(OutputFormat::Bmp),
        ImageFormat::Gif => Some(OutputFormat::Gif),
        _ => None,
    }
}

pub fn decode(bytes: &[u8]) -> Result<Raster> {
    if bytes.is_empty() {
        return Err(Error::decode("empty image payload"));
    }
    let detected = image::guess_format(bytes).ok().and_then(output_format);
    let img = image::load_from_memory(bytes).map_err(|e| Error::decode(e.to_string()))?;
    debug!(
        width = img.width(),
        height = img.height(),
        format = detected.map(|f| f.as_str()).unwrap_or("unknown"),
        "decoded raster"
    );
    Ok(Raster::from_image(img.to_rgba8()).with_source_format(detected))
}

/// Blend every pixel over an opaque `matte`.
pub fn flatten(image: &RgbaImage, matte: Color) -> RgbImage {
    let (w, h) = image.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let p = image.get_pixel(x, y).0;
        let a = p[3] as u32;
        let mix = |c: u8, m: u8| ((c as u32 * a + m as u32 * (255 - a) + 127) / 255) as u8;
        Rgb([mix(p[0], matte.r), mix(p[1], matte.g), mix(p[2], matte.b)])
    })
}

/// Encode `image` as `format`. Vector targets are rejected.
pub fn encode(image: &RgbaImage, format: OutputFormat, quality: Option<u8>, matte: Color) -> Result<Bytes> {
    let target = image_format(format).ok_or_else(|| Error::unsupported_format(format.as_str()))?;
    let matte = matte.with_alpha(255);
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);

    match format {
        OutputFormat::Jpeg => {
            let q = quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100);
            let encoder = JpegEncoder::new_with_quality(&mut cursor, q);
            flatten(image, matte)
                .write_with_encoder(encoder)
                .map_err(|e| Error::encode(format!("jpeg: {}", e)))?;
        }
        _ if !format.supports_alpha() => {
            DynamicImage::ImageRgb8(flatten(image, matte))
                .write_to(&mut cursor, target)
                .map_err(|e| Error::encode(format!("{}: {}", format, e)))?;
        }
        _ => {
            DynamicImage::ImageRgba8(image.clone())
                .write_to(&mut cursor, target)
                .map_err(|e| Error::encode(format!("{}: {}", format, e)))?;
        }
    }

    debug!(format = format.as_str(), bytes = buffer.len(), "encoded raster");
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_mattes_transparent_onto_white() {
        let mut img = RgbaImage::from_pixel(2, 1, image::Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 255]));
        let flat = flatten(&img, Color::WHITE);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_half_alpha_blends() {
        let img = RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 128]));
        let flat = flatten(&img, Color::WHITE);
        let v = flat.get_pixel(0, 0).0[0];
        assert!((126..=128).contains(&v), "got {}", v);
    }

    #[test]
    fn test_svg_is_unsupported() {
        let img = RgbaImage::new(1, 1);
        let err = encode(&img, OutputFormat::Svg, None, Color::WHITE).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(decode(b"not an image"), Err(Error::Decode { .. })));
        assert!(matches!(decode(&[]), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_bmp_has_no_transparency_after_round_trip() {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 0]));
        let bytes = encode(&img, OutputFormat::Bmp, None, Color::WHITE).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back.source_format(), Some(OutputFormat::Bmp));
        assert_eq!(back.transparent_pixel_count(), 0);
        assert_eq!(back.pixel(2, 2), Some(Color::WHITE));
    }
}
