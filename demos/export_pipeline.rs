//! Export Pipeline Example
//!
//! Generates a code through the service, post-processes it, and writes a
//! print-ready JPEG under a byte budget.
//!
//! Run with a generation server at `QRGEN_BASE_URL` (default http://localhost:3000):
//!
//! ```text
//! RUST_LOG=qrgen_client=debug cargo run --example export_pipeline -- https://example.com
//! ```

use qrgen_client::raster::{
    BorderStyle, Interpolation, Pipeline, SizeBudgetOptimizer, WatermarkPosition, WatermarkSpec,
};
use qrgen_client::units::{minimum_print_size, physical_to_pixels, PhysicalUnit};
use qrgen_client::{
    Color, ErrorCorrectionLevel, GenerationOptions, GenerationRequest, Mode, OutputFormat, QrClient,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qrgen_client=info")),
        )
        .init();

    let data = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    // Scanned from about 1.5 m: work out the printed side and the pixels it needs.
    let side_cm = minimum_print_size(150.0, PhysicalUnit::Centimeters)?;
    let side_px = physical_to_pixels(side_cm, PhysicalUnit::Centimeters, 300.0)?;
    println!("print side: {:.1} cm -> {} px at 300 dpi", side_cm, side_px);

    let client = QrClient::builder().build()?;
    let request = GenerationRequest::new(data, Mode::HighQuality).with_options(
        GenerationOptions::new()
            .with_size(side_px.min(2000))
            .with_error_correction(ErrorCorrectionLevel::High),
    );

    let report = client.validate(&request);
    if !report.is_valid {
        for issue in &report.issues {
            eprintln!("invalid request: {}", issue);
        }
        return Ok(());
    }

    let response = client.generate(&request).await?;
    println!(
        "generated {} ({}x{}, version {})",
        response.filename, response.size_px.width, response.size_px.height, response.metadata.version
    );

    let raster = response.to_raster()?;
    let pipeline = Pipeline::builder()
        .resize(side_px, side_px, true, Interpolation::Nearest)
        .pad(side_px / 20, Color::WHITE)
        .border(4, Color::BLACK, BorderStyle::Solid)
        .watermark(
            WatermarkSpec::new("scan me")
                .with_position(WatermarkPosition::BottomRight)
                .with_font(28, true)
                .with_opacity(0.7),
        )
        .build();
    let processed = pipeline.execute_async(raster).await?;

    let optimized = SizeBudgetOptimizer::new().optimize_async(processed, 250 * 1024, OutputFormat::Jpeg).await?;
    println!(
        "jpeg: {} bytes at quality {:.2} (budget met: {}, tried {:?})",
        optimized.len(),
        optimized.quality,
        optimized.met_budget,
        optimized.qualities_tried
    );

    let path = format!("qrcode-export.{}", OutputFormat::Jpeg.extension());
    tokio::fs::write(&path, &optimized.bytes).await?;
    println!("wrote {}", path);
    Ok(())
}
