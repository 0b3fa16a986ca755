//! Generation response types and the server envelope they are decoded from.

use super::request::{ErrorCorrectionLevel, GenerationRequest};
use crate::{Error, Result};
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Image format of a payload or an export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    Webp,
    Bmp,
    Gif,
    Svg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
            Self::Svg => "svg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            other => other.as_str(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
            Self::Svg => "image/svg+xml",
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Svg)
    }

    /// Formats that cannot carry transparency; content is matted before encoding.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpeg | Self::Bmp)
    }

    /// Formats whose encoder honours a lossy quality setting.
    pub fn supports_quality(&self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("image/").unwrap_or(&lower);
        match name {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            "bmp" => Ok(Self::Bmp),
            "gif" => Ok(Self::Gif),
            "svg" | "svg+xml" => Ok(Self::Svg),
            _ => Err(Error::unsupported_format(s)),
        }
    }
}

/// The image itself: encoded raster bytes or vector markup, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Raster(Bytes),
    Vector(String),
}

impl Payload {
    pub fn as_raster(&self) -> Option<&Bytes> {
        match self {
            Payload::Raster(b) => Some(b),
            Payload::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&str> {
        match self {
            Payload::Vector(s) => Some(s),
            Payload::Raster(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Raster(b) => b.len(),
            Payload::Vector(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

/// One encoded data segment reported by the encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub mode: String,
    #[serde(default)]
    pub num_chars: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrMetadata {
    pub version: u8,
    pub error_correction_level: ErrorCorrectionLevel,
    #[serde(default)]
    pub mask_pattern: u8,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Envelope metadata attached by the server to every answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Server error body; older deployments send a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ApiError {
    Message(String),
    Detailed {
        message: String,
        #[serde(default)]
        code: Option<String>,
    },
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Message(m) => m,
            ApiError::Detailed { message, .. } => message,
        }
    }
}

/// `data` member of a successful envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQr {
    pub format: OutputFormat,
    /// Base64 (optionally as a data URL) for raster formats, markup for svg.
    pub image: String,
    pub size: PixelSize,
    pub metadata: QrMetadata,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `{success, data|error, meta}` as returned by the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<GeneratedQr>,
    #[serde(default)]
    pub error: Option<ApiError>,
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

/// A completed generation, as cached and handed to callers.
///
/// Callers receive it behind an `Arc`; the cache keeps the same allocation, so it is
/// never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub success: bool,
    pub format: OutputFormat,
    pub payload: Payload,
    pub size_px: PixelSize,
    pub metadata: QrMetadata,
    pub filename: String,
    pub timestamp: String,
    pub server_meta: Option<ResponseMeta>,
}

impl GenerationResponse {
    /// Turn a server envelope into a response, or the server's failure into an error.
    pub fn from_envelope(
        envelope: ApiEnvelope,
        request: &GenerationRequest,
        status: Option<u16>,
    ) -> Result<Self> {
        if !envelope.success {
            let message = envelope
                .error
                .as_ref()
                .map(|e| e.message().to_string())
                .unwrap_or_else(|| "server reported failure without a message".to_string());
            return Err(Error::generation(message, status));
        }
        let data = envelope.data.ok_or_else(|| {
            Error::generation("successful response carried no data", status)
        })?;
        Self::from_generated(data, envelope.meta, request)
    }

    fn from_generated(
        data: GeneratedQr,
        meta: Option<ResponseMeta>,
        request: &GenerationRequest,
    ) -> Result<Self> {
        let payload = if data.format.is_vector() {
            Payload::Vector(data.image)
        } else {
            Payload::Raster(decode_base64_image(&data.image)?)
        };
        let timestamp = data
            .timestamp
            .or_else(|| meta.as_ref().and_then(|m| m.timestamp.clone()))
            .unwrap_or_default();
        let filename = data
            .filename
            .or_else(|| request.filename.clone())
            .unwrap_or_else(|| default_filename(&timestamp, data.format));

        Ok(Self {
            success: true,
            format: data.format,
            payload,
            size_px: data.size,
            metadata: data.metadata,
            filename,
            timestamp,
            server_meta: meta,
        })
    }

    /// Decode a raster payload into a pixel surface.
    pub fn to_raster(&self) -> Result<crate::raster::Raster> {
        match &self.payload {
            Payload::Raster(bytes) => crate::raster::Raster::decode(bytes),
            Payload::Vector(_) => Err(Error::unsupported_format(format!(
                "{} payload cannot be rasterized",
                self.format
            ))),
        }
    }
}

fn default_filename(timestamp: &str, format: OutputFormat) -> String {
    let stamp: String = timestamp
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if stamp.is_empty() {
        format!("qrcode.{}", format.extension())
    } else {
        format!("qrcode-{}.{}", stamp, format.extension())
    }
}

fn decode_base64_image(image: &str) -> Result<Bytes> {
    let encoded = match image.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => image,
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map(Bytes::from)
        .map_err(|e| Error::decode(format!("payload is not valid base64: {}", e)))
}
