//! 请求校验：在请求离开客户端前进行结构与语义检查。
//!
//! Request validation.
//!
//! Validation never fails with an error: problems are collected into a
//! [`ValidationReport`] so the UI can show every field issue at once.

use crate::types::color::is_hex_triple;
use crate::types::{ErrorCorrectionLevel, GenerationOptions, GenerationRequest, Mode};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Byte-mode capacity of a version 40 symbol at level L.
pub const MAX_DATA_LENGTH: usize = 2953;

/// Bounds enforced by the [`Validator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub max_data_length: usize,
    pub min_size: u32,
    pub max_size: u32,
    pub max_margin: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_data_length: MAX_DATA_LENGTH,
            min_size: 50,
            max_size: 2000,
            max_margin: 20,
        }
    }
}

/// A single problem with a candidate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            issues,
        }
    }

    /// Human-readable messages, one per issue.
    pub fn errors(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.to_string()).collect()
    }

    /// Convert a failing report into a validation error pointing at the first bad field.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            return Ok(());
        }
        let first = &self.issues[0];
        let mut context = ErrorContext::new()
            .with_field_path(first.field.clone())
            .with_source("validator");
        if self.issues.len() > 1 {
            context = context.with_details(self.errors().join("; "));
        }
        Err(Error::validation_with_context(first.message.clone(), context))
    }
}

struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

/// Structural and semantic checks for generation requests.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    limits: ValidationLimits,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Validate a typed request.
    pub fn validate(&self, request: &GenerationRequest) -> ValidationReport {
        let mut issues = Issues(Vec::new());
        self.check_data(Some(&request.data), &mut issues);
        // `mode` is a closed enum here, so it is known by construction.
        self.check_options(&request.options, &mut issues);
        self.check_filename(request.filename.as_deref(), &mut issues);
        ValidationReport::from_issues(issues.0)
    }

    /// Validate an untyped candidate, e.g. form state serialized by the UI.
    pub fn validate_value(&self, candidate: &Value) -> ValidationReport {
        let mut issues = Issues(Vec::new());
        let obj = match candidate.as_object() {
            Some(o) => o,
            None => {
                issues.push("request", "request must be a JSON object");
                return ValidationReport::from_issues(issues.0);
            }
        };

        match obj.get("data") {
            None | Some(Value::Null) => issues.push("data", "data is required"),
            Some(Value::String(s)) => self.check_data(Some(s), &mut issues),
            Some(_) => issues.push("data", "data must be a string"),
        }

        match obj.get("mode").and_then(Value::as_str) {
            Some(m) if m.parse::<Mode>().is_ok() => {}
            Some(m) => issues.push(
                "mode",
                format!(
                    "mode '{}' is invalid; expected one of {}",
                    m,
                    Mode::ALL.map(|m| m.as_str()).join(", ")
                ),
            ),
            None => issues.push("mode", "mode is required"),
        }

        if let Some(options) = obj.get("options").filter(|v| !v.is_null()) {
            self.check_option_value(options, &mut issues);
        }

        match obj.get("filename") {
            None | Some(Value::Null) => {}
            Some(Value::String(f)) => self.check_filename(Some(f), &mut issues),
            Some(_) => issues.push("filename", "filename must be a string"),
        }

        ValidationReport::from_issues(issues.0)
    }

    fn check_data(&self, data: Option<&str>, issues: &mut Issues) {
        let data = match data {
            Some(d) if !d.trim().is_empty() => d,
            _ => {
                issues.push("data", "data is required");
                return;
            }
        };
        let len = data.chars().count();
        if len > self.limits.max_data_length {
            issues.push(
                "data",
                format!(
                    "data length {} exceeds maximum of {} characters",
                    len, self.limits.max_data_length
                ),
            );
        }
    }

    fn check_options(&self, options: &GenerationOptions, issues: &mut Issues) {
        self.check_size(u64::from(options.size), issues);
        self.check_margin(u64::from(options.margin), issues);
        self.check_colors(Some(&options.foreground), Some(&options.background), issues);
        if let Some(q) = options.quality {
            self.check_quality(u64::from(q), issues);
        }
    }

    fn check_option_value(&self, options: &Value, issues: &mut Issues) {
        let obj = match options.as_object() {
            Some(o) => o,
            None => {
                issues.push("options", "options must be an object");
                return;
            }
        };

        if let Some(size) = obj.get("size") {
            match size.as_u64() {
                Some(s) => self.check_size(s, issues),
                None => issues.push("options.size", "size must be a positive integer"),
            }
        }
        if let Some(margin) = obj.get("margin") {
            match margin.as_u64() {
                Some(m) => self.check_margin(m, issues),
                None => issues.push("options.margin", "margin must be a non-negative integer"),
            }
        }

        let color = |key: &str| obj.get(key).and_then(Value::as_str);
        for key in ["foreground", "background"] {
            if obj.get(key).is_some() && color(key).is_none() {
                issues.push(&format!("options.{}", key), format!("{} color must be a string", key));
            }
        }
        self.check_colors(color("foreground"), color("background"), issues);

        if let Some(level) = obj.get("errorCorrectionLevel") {
            let known = level
                .as_str()
                .map(|s| s.parse::<ErrorCorrectionLevel>().is_ok())
                .unwrap_or(false);
            if !known {
                issues.push(
                    "options.errorCorrectionLevel",
                    "error correction level is invalid; expected one of L, M, Q, H",
                );
            }
        }

        if let Some(quality) = obj.get("quality").filter(|v| !v.is_null()) {
            match quality.as_u64() {
                Some(q) => self.check_quality(q, issues),
                None => issues.push("options.quality", "quality must be an integer"),
            }
        }
    }

    fn check_size(&self, size: u64, issues: &mut Issues) {
        let (min, max) = (u64::from(self.limits.min_size), u64::from(self.limits.max_size));
        if size < min || size > max {
            issues.push(
                "options.size",
                format!("size {} is invalid; must be between {} and {} pixels", size, min, max),
            );
        }
    }

    fn check_margin(&self, margin: u64, issues: &mut Issues) {
        if margin > u64::from(self.limits.max_margin) {
            issues.push(
                "options.margin",
                format!(
                    "margin {} exceeds maximum of {} modules",
                    margin, self.limits.max_margin
                ),
            );
        }
    }

    fn check_colors(&self, fg: Option<&str>, bg: Option<&str>, issues: &mut Issues) {
        let mut both_valid = true;
        for (field, value) in [("options.foreground", fg), ("options.background", bg)] {
            match value {
                Some(v) if is_hex_triple(v) => {}
                Some(v) => {
                    both_valid = false;
                    issues.push(field, format!("color '{}' is invalid; expected #RRGGBB", v));
                }
                None => both_valid = false,
            }
        }
        if let (true, Some(fg), Some(bg)) = (both_valid, fg, bg) {
            if fg.eq_ignore_ascii_case(bg) {
                issues.push(
                    "options.background",
                    "foreground and background colors are identical; the code would be unreadable",
                );
            }
        }
    }

    fn check_quality(&self, quality: u64, issues: &mut Issues) {
        if !(1..=100).contains(&quality) {
            issues.push(
                "options.quality",
                format!("quality {} is invalid; must be between 1 and 100", quality),
            );
        }
    }

    fn check_filename(&self, filename: Option<&str>, issues: &mut Issues) {
        if let Some(name) = filename {
            if name.trim().is_empty() {
                issues.push("filename", "filename must not be blank when provided");
            } else if name.contains(['/', '\\']) || name.contains("..") {
                issues.push("filename", "filename contains invalid path characters");
            }
        }
    }
}
