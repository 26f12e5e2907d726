use history_types::{Plane, Sketch};
use serde::{Deserialize, Serialize};
use shape_kernel::KernelError;
use sketch_solver::ProfileError;

/// A sketch together with the plane it is drawn on.
#[derive(Debug, Clone, Copy)]
pub struct PlacedSketch<'a> {
    pub sketch: &'a Sketch,
    pub plane: &'a Plane,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanKind {
    Fuse,
    Cut,
    Intersect,
}

/// Edges picked by index into the kernel's edge enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeSelection {
    All,
    Indices(Vec<usize>),
}

/// Resolved extrude settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrudeParams {
    /// Signed distance along `direction`.
    pub depth: f64,
    /// Defaults to the sketch plane normal.
    pub direction: Option<[f64; 3]>,
    /// Extend `depth / 2` to each side of the sketch plane.
    pub symmetric: bool,
}

/// Resolved pattern layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layout {
    Linear {
        direction: [f64; 3],
        spacing: f64,
        count: u32,
    },
    Circular {
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        count: u32,
        total_angle_deg: f64,
    },
}

/// Resolved rigid transform with uniform scale, applied as scale, rotate, translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub translation: [f64; 3],
    pub rotation_axis: [f64; 3],
    pub rotation_deg: f64,
    pub scale: f64,
}

/// Errors from modeling operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("no usable profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}

impl OpError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        OpError::InvalidParameter {
            reason: reason.into(),
        }
    }
}

/// Reject non-finite and non-positive values.
pub(crate) fn require_positive(name: &str, value: f64) -> Result<f64, OpError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(OpError::invalid(format!("{} must be positive, got {}", name, value)))
    }
}
