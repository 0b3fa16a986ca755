//! Benchmarks for raster pipeline performance
//!
//! This benchmark measures:
//! - Nearest vs smooth resize of a QR-sized surface
//! - A typical export chain (resize, pad, border, watermark)
//! - JPEG encode with matting, and the size-budget walk

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use image::{Rgba, RgbaImage};
use qrgen_client::raster::{
    optimize_for_budget, BorderStyle, Interpolation, Pipeline, WatermarkSpec,
};
use qrgen_client::{Color, OutputFormat, Raster};

/// 33x33 module grid at 10px per module, transparent light modules.
fn qr_like() -> Raster {
    Raster::from_image(RgbaImage::from_fn(330, 330, |x, y| {
        let (mx, my) = (x / 10, y / 10);
        if (mx * 7 + my * 13 + mx * my) % 3 == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }))
}

fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize");
    let input = qr_like();
    group.throughput(Throughput::Elements((input.width() * input.height()) as u64));

    group.bench_function("nearest_1000", |b| {
        let p = Pipeline::builder().resize(1000, 1000, true, Interpolation::Nearest).build();
        b.iter(|| p.execute(black_box(&input)).unwrap())
    });

    group.bench_function("smooth_1000", |b| {
        let p = Pipeline::builder().resize(1000, 1000, true, Interpolation::Smooth).build();
        b.iter(|| p.execute(black_box(&input)).unwrap())
    });

    group.finish();
}

fn bench_export_chain(c: &mut Criterion) {
    let input = qr_like();
    let pipeline = Pipeline::builder()
        .resize(600, 600, true, Interpolation::Nearest)
        .pad(30, Color::WHITE)
        .border(6, Color::BLACK, BorderStyle::Dashed)
        .watermark(WatermarkSpec::new("qrgen").with_opacity(0.6))
        .build();

    c.bench_function("export_chain", |b| {
        b.iter(|| pipeline.execute(black_box(&input)).unwrap())
    });
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let input = qr_like();

    group.bench_function("png", |b| {
        b.iter(|| black_box(&input).encode(OutputFormat::Png, None).unwrap())
    });

    group.bench_function("jpeg_q85_matted", |b| {
        b.iter(|| black_box(&input).encode(OutputFormat::Jpeg, Some(85)).unwrap())
    });

    group.bench_function("optimize_for_budget_8k", |b| {
        b.iter(|| optimize_for_budget(black_box(&input), 8 * 1024, OutputFormat::Jpeg).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_resize, bench_export_chain, bench_encode);
criterion_main!(benches);
