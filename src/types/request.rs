//! Generation request types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generation mode understood by the remote encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Basic,
    Colored,
    Vector,
    HighQuality,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Basic, Mode::Colored, Mode::Vector, Mode::HighQuality];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Basic => "basic",
            Mode::Colored => "colored",
            Mode::Vector => "vector",
            Mode::HighQuality => "high_quality",
        }
    }

    /// Vector mode always renders markup, whatever the options say.
    pub fn render_target(&self, hint: RenderTarget) -> RenderTarget {
        match self {
            Mode::Vector => RenderTarget::Vector,
            _ => hint,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Mode::Basic),
            "colored" => Ok(Mode::Colored),
            "vector" => Ok(Mode::Vector),
            "high_quality" | "high-quality" => Ok(Mode::HighQuality),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// QR error-correction level (L ~7%, M ~15%, Q ~25%, H ~30% recoverable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorCorrectionLevel {
    #[serde(rename = "L")]
    Low,
    #[default]
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "Q")]
    Quartile,
    #[serde(rename = "H")]
    High,
}

impl ErrorCorrectionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "L",
            Self::Medium => "M",
            Self::Quartile => "Q",
            Self::High => "H",
        }
    }
}

impl FromStr for ErrorCorrectionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" | "l" => Ok(Self::Low),
            "M" | "m" => Ok(Self::Medium),
            "Q" | "q" => Ok(Self::Quartile),
            "H" | "h" => Ok(Self::High),
            other => Err(format!("unknown error correction level '{}'", other)),
        }
    }
}

/// Whether the server should answer with raster bytes or vector markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderTarget {
    #[default]
    Raster,
    Vector,
}

/// Rendering options sent along with the data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    /// Edge length in pixels; QR codes are square so width == height.
    pub size: u32,
    /// Quiet zone in modules.
    pub margin: u32,
    /// `#RRGGBB`
    pub foreground: String,
    /// `#RRGGBB`
    pub background: String,
    pub error_correction_level: ErrorCorrectionLevel,
    /// Encoder quality hint, 1..=100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    pub render_target: RenderTarget,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            size: 300,
            margin: 4,
            foreground: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            error_correction_level: ErrorCorrectionLevel::default(),
            quality: None,
            render_target: RenderTarget::default(),
        }
    }
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_colors(mut self, foreground: impl Into<String>, background: impl Into<String>) -> Self {
        self.foreground = foreground.into();
        self.background = background.into();
        self
    }

    pub fn with_error_correction(mut self, level: ErrorCorrectionLevel) -> Self {
        self.error_correction_level = level;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_render_target(mut self, target: RenderTarget) -> Self {
        self.render_target = target;
        self
    }
}

/// A single generation request, as submitted by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub data: String,
    pub mode: Mode,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl GenerationRequest {
    pub fn new(data: impl Into<String>, mode: Mode) -> Self {
        Self {
            data: data.into(),
            mode,
            options: GenerationOptions::default(),
            filename: None,
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn render_target(&self) -> RenderTarget {
        self.mode.render_target(self.options.render_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let req = GenerationRequest::new("https://example.com", Mode::HighQuality)
            .with_options(GenerationOptions::new().with_error_correction(ErrorCorrectionLevel::High));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["mode"], json!("high_quality"));
        assert_eq!(v["options"]["errorCorrectionLevel"], json!("H"));
        assert_eq!(v["options"]["renderTarget"], json!("raster"));
        assert!(v.get("filename").is_none());
    }

    #[test]
    fn test_missing_options_fall_back_to_defaults() {
        let req: GenerationRequest =
            serde_json::from_value(json!({"data": "hello", "mode": "basic"})).unwrap();
        assert_eq!(req.options, GenerationOptions::default());
    }

    #[test]
    fn test_vector_mode_forces_vector_target() {
        let req = GenerationRequest::new("x", Mode::Vector);
        assert_eq!(req.render_target(), RenderTarget::Vector);
        assert_eq!(
            GenerationRequest::new("x", Mode::Basic).render_target(),
            RenderTarget::Raster
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("HIGH_QUALITY".parse::<Mode>(), Ok(Mode::HighQuality));
        assert!("sparkly".parse::<Mode>().is_err());
    }
}
