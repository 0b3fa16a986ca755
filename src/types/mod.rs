//! 类型模块：生成请求、响应与颜色等核心数据类型。
//!
//! # Types Module
//!
//! Core data model shared by the request lifecycle and the raster pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GenerationRequest`] | Data, mode and rendering options submitted by the UI |
//! | [`GenerationOptions`] | Size, margin, colors, error correction, render target |
//! | [`GenerationResponse`] | Decoded server answer, shared with the cache |
//! | [`Payload`] | Raster bytes or vector markup |
//! | [`ApiEnvelope`] | Wire shape `{success, data|error, meta}` |
//! | [`Color`] | RGBA color parsed from hex notation |

pub mod color;
pub mod request;
pub mod response;

pub use color::Color;
pub use request::{ErrorCorrectionLevel, GenerationOptions, GenerationRequest, Mode, RenderTarget};
pub use response::{
    ApiEnvelope, ApiError, GeneratedQr, GenerationResponse, OutputFormat, Payload, PixelSize,
    QrMetadata, ResponseMeta, Segment,
};
