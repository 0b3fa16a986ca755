//! Raster pipeline integration tests: decode, transform, export.

use image::{Rgba, RgbaImage};
use qrgen_client::raster::{
    optimize_for_budget, BorderStyle, FilterKind, Interpolation, Layer, Pipeline, PipelineOperation,
    WatermarkPosition, WatermarkSpec,
};
use qrgen_client::units::{minimum_print_size, physical_to_pixels, PhysicalUnit};
use qrgen_client::{Color, Error, OutputFormat, Raster};

/// QR-like test card: black modules on a transparent background.
fn transparent_card() -> Raster {
    Raster::from_image(RgbaImage::from_fn(40, 40, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 && x > 8 && y > 8 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }))
}

#[test]
fn test_transparent_png_to_jpeg_has_no_transparent_or_black_background() {
    let png = transparent_card().encode(OutputFormat::Png, None).unwrap();
    let decoded = Raster::decode(&png).unwrap();
    assert_eq!(decoded.source_format(), Some(OutputFormat::Png));
    assert!(decoded.transparent_pixel_count() > 0);

    let jpeg = Pipeline::builder()
        .convert(OutputFormat::Jpeg, Some(95))
        .build()
        .execute(&decoded)
        .unwrap();
    assert_eq!(jpeg.source_format(), Some(OutputFormat::Jpeg));
    assert_eq!(jpeg.transparent_pixel_count(), 0);

    // (0, 0) and (2, 2) were fully transparent: they must come out near white.
    for (x, y) in [(0, 0), (2, 2), (39, 0)] {
        let p = jpeg.pixel(x, y).unwrap();
        assert!(p.r > 230 && p.g > 230 && p.b > 230, "({}, {}) = {}", x, y, p);
    }
}

#[test]
fn test_convert_to_svg_is_unsupported() {
    let err = Pipeline::from_operations([PipelineOperation::ConvertFormat {
        format: OutputFormat::Svg,
        quality: None,
        matte: Color::WHITE,
    }])
    .execute(&transparent_card())
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn test_resize_preserves_aspect() {
    let wide = Raster::new(100, 50, Color::BLACK);
    let out = Pipeline::builder()
        .resize(60, 60, true, Interpolation::Nearest)
        .build()
        .execute(&wide)
        .unwrap();
    assert_eq!(out.dimensions(), (60, 30));
}

#[test]
fn test_full_export_pipeline() {
    let badge = Raster::new(8, 8, Color::rgb(200, 0, 0));
    let pipeline = Pipeline::builder()
        .resize(200, 200, true, Interpolation::Nearest)
        .pad(20, Color::WHITE)
        .border(4, Color::BLACK, BorderStyle::Dashed)
        .composite(
            vec![Layer::input(0, 0), Layer::image(badge, 112, 112).with_width(24)],
            248,
            248,
            Color::WHITE,
        )
        .watermark(
            WatermarkSpec::new("scan me")
                .with_position(WatermarkPosition::BottomLeft)
                .with_opacity(0.8),
        )
        .filter(FilterKind::Contrast, 1.2)
        .rotate(90.0)
        .crop(4, 4, 240, 240)
        .convert(OutputFormat::Jpeg, Some(90))
        .build();
    assert_eq!(pipeline.len(), 9);

    let out = pipeline.execute(&transparent_card()).unwrap();
    assert_eq!(out.dimensions(), (240, 240));
    assert_eq!(out.transparent_pixel_count(), 0);

    let bytes = out.encode(OutputFormat::Jpeg, Some(90)).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_usage_errors_surface_from_pipeline() {
    let card = transparent_card();
    let crop = Pipeline::builder().crop(30, 30, 20, 20).build().execute(&card);
    assert!(matches!(crop, Err(Error::InvalidOperation { .. })));

    let filter = Pipeline::builder().filter(FilterKind::Blur, f32::NAN).build().execute(&card);
    assert!(matches!(filter, Err(Error::InvalidOperation { .. })));
}

#[test]
fn test_optimizer_budget_and_floor() {
    let noisy = Raster::from_image(RgbaImage::from_fn(96, 96, |x, y| {
        let v = ((x * 31 + y * 17) ^ (x * y)) as u8;
        Rgba([v, v.wrapping_mul(3), v.wrapping_add(91), 255])
    }));

    let loose = optimize_for_budget(&noisy, 1 << 20, OutputFormat::Jpeg).unwrap();
    assert!(loose.met_budget);

    let budget = loose.len() / 2;
    let tight = optimize_for_budget(&noisy, budget, OutputFormat::Jpeg).unwrap();
    if tight.met_budget {
        assert!(tight.len() <= budget);
    } else {
        assert_eq!(tight.qualities_tried.last(), Some(&0.10));
    }
    assert!(tight.qualities_tried.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(tight.to_raster().unwrap().dimensions(), (96, 96));
}

#[test]
fn test_print_size_to_pixels() {
    // A code meant to be scanned from 50 cm needs 5 cm; at 300 dpi that is 591 px.
    let side = minimum_print_size(50.0, PhysicalUnit::Centimeters).unwrap();
    assert!((side - 5.0).abs() < 1e-9);
    assert_eq!(physical_to_pixels(side, PhysicalUnit::Centimeters, 300.0).unwrap(), 591);
}
