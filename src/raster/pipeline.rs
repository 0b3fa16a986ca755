//! Ordered stage chains executed in one pass.

use crate::raster::ops::{
    self, BorderStyle, FilterKind, Interpolation, Layer, WatermarkSpec,
};
use crate::raster::Raster;
use crate::types::{Color, OutputFormat};
use crate::{Error, ErrorContext, Result};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// One raster transform: `apply(input) -> output`, never mutating `input`.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, input: &Raster) -> Result<Raster>;
}

/// The built-in stages.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOperation {
    ConvertFormat {
        format: OutputFormat,
        quality: Option<u8>,
        matte: Color,
    },
    Resize {
        width: u32,
        height: u32,
        maintain_aspect: bool,
        interpolation: Interpolation,
    },
    Pad {
        amount: u32,
        color: Color,
    },
    Border {
        width: u32,
        color: Color,
        style: BorderStyle,
    },
    Filter {
        kind: FilterKind,
        intensity: f32,
    },
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Rotate {
        degrees: f32,
    },
    Composite {
        layers: Vec<Layer>,
        width: u32,
        height: u32,
        background: Color,
    },
    Watermark(WatermarkSpec),
}

impl Stage for PipelineOperation {
    fn name(&self) -> &'static str {
        match self {
            PipelineOperation::ConvertFormat { .. } => "convert_format",
            PipelineOperation::Resize { .. } => "resize",
            PipelineOperation::Pad { .. } => "pad",
            PipelineOperation::Border { .. } => "border",
            PipelineOperation::Filter { .. } => "filter",
            PipelineOperation::Crop { .. } => "crop",
            PipelineOperation::Rotate { .. } => "rotate",
            PipelineOperation::Composite { .. } => "composite",
            PipelineOperation::Watermark(_) => "watermark",
        }
    }

    fn apply(&self, input: &Raster) -> Result<Raster> {
        match self {
            PipelineOperation::ConvertFormat {
                format,
                quality,
                matte,
            } => ops::convert(input, *format, *quality, *matte),
            PipelineOperation::Resize {
                width,
                height,
                maintain_aspect,
                interpolation,
            } => ops::resize(input, *width, *height, *maintain_aspect, *interpolation),
            PipelineOperation::Pad { amount, color } => ops::pad(input, *amount, *color),
            PipelineOperation::Border {
                width,
                color,
                style,
            } => ops::border(input, *width, *color, *style),
            PipelineOperation::Filter { kind, intensity } => ops::filter(input, *kind, *intensity),
            PipelineOperation::Crop {
                x,
                y,
                width,
                height,
            } => ops::crop(input, *x, *y, *width, *height),
            PipelineOperation::Rotate { degrees } => ops::rotate(input, *degrees),
            PipelineOperation::Composite {
                layers,
                width,
                height,
                background,
            } => ops::composite(input, layers, *width, *height, *background),
            PipelineOperation::Watermark(spec) => ops::watermark(input, spec),
        }
    }
}

/// Builder for [`Pipeline`]. Stages run in the order they are added.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a custom stage.
    pub fn add_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn operation(self, op: PipelineOperation) -> Self {
        self.add_stage(op)
    }

    pub fn convert(self, format: OutputFormat, quality: Option<u8>) -> Self {
        self.operation(PipelineOperation::ConvertFormat {
            format,
            quality,
            matte: Color::WHITE,
        })
    }

    pub fn resize(self, width: u32, height: u32, maintain_aspect: bool, interpolation: Interpolation) -> Self {
        self.operation(PipelineOperation::Resize {
            width,
            height,
            maintain_aspect,
            interpolation,
        })
    }

    pub fn pad(self, amount: u32, color: Color) -> Self {
        self.operation(PipelineOperation::Pad { amount, color })
    }

    pub fn border(self, width: u32, color: Color, style: BorderStyle) -> Self {
        self.operation(PipelineOperation::Border { width, color, style })
    }

    pub fn filter(self, kind: FilterKind, intensity: f32) -> Self {
        self.operation(PipelineOperation::Filter { kind, intensity })
    }

    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Self {
        self.operation(PipelineOperation::Crop { x, y, width, height })
    }

    pub fn rotate(self, degrees: f32) -> Self {
        self.operation(PipelineOperation::Rotate { degrees })
    }

    pub fn composite(self, layers: Vec<Layer>, width: u32, height: u32, background: Color) -> Self {
        self.operation(PipelineOperation::Composite {
            layers,
            width,
            height,
            background,
        })
    }

    pub fn watermark(self, spec: WatermarkSpec) -> Self {
        self.operation(PipelineOperation::Watermark(spec))
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages.into(),
        }
    }
}

/// Immutable, cheaply clonable stage chain.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Stage>]>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn from_operations(ops: impl IntoIterator<Item = PipelineOperation>) -> Self {
        ops.into_iter()
            .fold(PipelineBuilder::new(), PipelineBuilder::operation)
            .build()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Thread `input` through every stage in order. An empty pipeline returns a copy.
    pub fn execute(&self, input: &Raster) -> Result<Raster> {
        let mut current = Cow::Borrowed(input);
        for (index, stage) in self.stages.iter().enumerate() {
            let next = stage.apply(&current).map_err(|e| {
                warn!(stage = stage.name(), index, error = %e, "pipeline stage failed");
                e
            })?;
            debug!(
                stage = stage.name(),
                index,
                width = next.width(),
                height = next.height(),
                "pipeline stage applied"
            );
            current = Cow::Owned(next);
        }
        Ok(current.into_owned())
    }

    /// [`execute`](Self::execute) on the blocking pool.
    pub async fn execute_async(&self, input: Raster) -> Result<Raster> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.execute(&input))
            .await
            .map_err(|e| {
                Error::invalid_operation(
                    format!("pipeline task failed: {}", e),
                    ErrorContext::new().with_source("raster"),
                )
            })?
    }
}
