//! 错误类型：统一的错误分类与可重试性判定。
//!
//! Unified error type for the generation client and raster pipeline.

use std::time::Duration;
use thiserror::Error;

/// Message fragments that mark an error as validation-class (never retried).
const FATAL_MARKERS: &[&str] = &["invalid", "required", "exceeds maximum", "unsupported"];

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "options.size", "pipeline[2].crop")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "validator", "raster_pipeline")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse error category, used for retry decisions and batch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Network,
    Timeout,
    Cancelled,
    Generation,
    Decode,
    Encode,
    UnsupportedFormat,
    InvalidOperation,
    Configuration,
    Serialization,
    Io,
}

impl ErrorKind {
    /// Returns the stable snake_case name (e.g., `"timeout"`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Generation => "generation",
            Self::Decode => "decode",
            Self::Encode => "encode",
            Self::UnsupportedFormat => "unsupported_format",
            Self::InvalidOperation => "invalid_operation",
            Self::Configuration => "configuration",
            Self::Serialization => "serialization",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Unified error type for the QR generation client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Network(#[from] crate::transport::TransportError),

    #[error("Request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("Request {request_id} was cancelled")]
    Cancelled { request_id: String },

    #[error("Generation failed{}: {message}", format_status(.status))]
    Generation {
        message: String,
        status: Option<u16>,
    },

    #[error("Raster decode error: {message}")]
    Decode { message: String },

    #[error("Raster encode error: {message}")]
    Encode { message: String },

    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid operation: {message}{}", format_context(.context))]
    InvalidOperation {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new invalid-operation error with structured context
    pub fn invalid_operation(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidOperation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn generation(msg: impl Into<String>, status: Option<u16>) -> Self {
        Error::Generation {
            message: msg.into(),
            status,
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode { message: msg.into() }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Error::Encode { message: msg.into() }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Error::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::InvalidOperation { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Network(_) => ErrorKind::Network,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
            Error::Generation { .. } => ErrorKind::Generation,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Encode { .. } => ErrorKind::Encode,
            Error::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Error::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether another attempt of the same exchange could succeed.
    ///
    /// Network, timeout and io failures are always retryable. A server-reported
    /// failure is retryable unless its message carries a validation-class marker.
    /// Everything raster-related, caller cancellation and local validation are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout { .. } | Error::Io(_) => true,
            Error::Generation { message, .. } => !has_fatal_marker(message),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

pub(crate) fn has_fatal_marker(message: &str) -> bool {
    let m = message.to_lowercase();
    FATAL_MARKERS.iter().any(|marker| m.contains(marker))
}
