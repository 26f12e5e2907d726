//! Sketch-free primitive solids.

use shape_kernel::{Kernel, ShapeHandle};

use crate::types::{require_positive, OpError};

pub fn execute_box(
    kernel: &mut dyn Kernel,
    origin: [f64; 3],
    dx: f64,
    dy: f64,
    dz: f64,
) -> Result<ShapeHandle, OpError> {
    let size = [
        require_positive("box dx", dx)?,
        require_positive("box dy", dy)?,
        require_positive("box dz", dz)?,
    ];
    Ok(kernel.make_box(origin, size)?)
}

pub fn execute_cylinder(
    kernel: &mut dyn Kernel,
    origin: [f64; 3],
    radius: f64,
    height: f64,
) -> Result<ShapeHandle, OpError> {
    let radius = require_positive("cylinder radius", radius)?;
    let height = require_positive("cylinder height", height)?;
    Ok(kernel.make_cylinder(origin, radius, height)?)
}

pub fn execute_sphere(kernel: &mut dyn Kernel, center: [f64; 3], radius: f64) -> Result<ShapeHandle, OpError> {
    let radius = require_positive("sphere radius", radius)?;
    Ok(kernel.make_sphere(center, radius)?)
}

/// Cone or frustum; a zero top radius gives a pointed cone.
pub fn execute_cone(
    kernel: &mut dyn Kernel,
    origin: [f64; 3],
    bottom_radius: f64,
    top_radius: f64,
    height: f64,
) -> Result<ShapeHandle, OpError> {
    let bottom_radius = require_positive("cone bottom radius", bottom_radius)?;
    let height = require_positive("cone height", height)?;
    if !top_radius.is_finite() || top_radius < 0.0 {
        return Err(OpError::invalid(format!(
            "cone top radius must not be negative, got {}",
            top_radius
        )));
    }
    Ok(kernel.make_cone(origin, bottom_radius, top_radius, height)?)
}
